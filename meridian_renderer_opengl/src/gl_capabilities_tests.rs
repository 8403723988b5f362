use super::*;

fn extensions(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_core_46_needs_no_extensions() {
    assert!(missing_features((4, 6), &HashSet::new()).is_empty());
    assert!(check_capabilities((4, 6), &HashSet::new()).is_ok());
}

#[test]
fn test_43_needs_buffer_storage_extension() {
    let missing = missing_features((4, 3), &extensions(&["GL_ARB_debug_output"]));
    assert_eq!(missing, vec!["GL_ARB_buffer_storage".to_string()]);
    assert!(missing_features((4, 3), &extensions(&["GL_ARB_buffer_storage"])).is_empty());
}

#[test]
fn test_old_context_rejected() {
    let result = check_capabilities((3, 3), &HashSet::new());
    assert!(matches!(result, Err(Error::InitializationFailed(msg)) if msg.contains("OpenGL 4.3")));
}
