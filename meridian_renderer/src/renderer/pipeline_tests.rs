use super::*;

fn float_attr(count: u32, offset: u32) -> VertexAttribute {
    VertexAttribute { buf_binding: 0, count, format: VertexFormat::Float, offset }
}

#[test]
fn test_set_bits() {
    assert_eq!(set_bits(0).count(), 0);
    assert_eq!(set_bits(0b1010_0001).collect::<Vec<_>>(), vec![0, 5, 7]);
    assert_eq!(set_bits(1 << 31).collect::<Vec<_>>(), vec![31]);
}

#[test]
fn test_changed_attribs_only_touches_differences() {
    // 0 stays on, 1 turns off, 2 turns on, 3 stays off
    let changes: Vec<_> = changed_attribs(0b0011, 0b0101).collect();
    assert_eq!(changes, vec![(1, false), (2, true)]);
}

#[test]
fn test_builder_sets_mask_and_attribs() {
    let desc = PipelineDesc::new("color")
        .vertex_attrib(0, float_attr(3, 0))
        .vertex_attrib(2, float_attr(4, 12))
        .vertex_buffer_stride(0, 28)
        .depth_test(true);
    assert_eq!(desc.vertex_attrib_mask, 0b101);
    assert_eq!(desc.vertex_buffers[0].stride, 28);
    let enabled: Vec<_> = desc.enabled_attribs().map(|(loc, a)| (loc, a.offset)).collect();
    assert_eq!(enabled, vec![(0, 0), (2, 12)]);
    assert!(desc.depth_test);
    assert!(!desc.depth_write);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_attrib_location_out_of_range() {
    PipelineDesc::new("bad").vertex_attrib(MAX_VERTEX_ATTRIBS as u32, float_attr(1, 0));
}

#[test]
#[should_panic(expected = "components")]
fn test_attrib_component_count_checked() {
    PipelineDesc::new("bad").vertex_attrib(0, float_attr(5, 0));
}
