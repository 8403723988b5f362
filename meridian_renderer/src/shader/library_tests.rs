use super::*;
use crate::error::Error;
use std::fs::File;
use std::time::{Duration, SystemTime};

/// Fake compiler: bytecode is the source length plus a macro count, so
/// the output depends on the input without invoking a real compiler
#[derive(Default)]
struct CountingCompiler {
    compiles: usize,
    optimizes: usize,
    last_source: String,
}

impl ShaderCompiler for CountingCompiler {
    fn compile(&mut self, _name: &str, source: &str, _stage: ShaderStage, macros: &ShaderMacros) -> Result<Vec<u32>> {
        self.compiles += 1;
        self.last_source = source.to_string();
        if source.contains("syntax error") {
            return Err(Error::ShaderCompilationFailed("syntax error".to_string()));
        }
        Ok(vec![0x0723_0203, 0x0001_0000, 0, source.len() as u32, macros.sorted_strings().len() as u32])
    }

    fn optimize(&mut self, _name: &str, spirv: &[u32], _stage: ShaderStage) -> Result<Vec<u32>> {
        self.optimizes += 1;
        Ok(spirv.to_vec())
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("meridian_library_test_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn library(dir: &Path) -> ShaderLibrary<CountingCompiler> {
    ShaderLibrary::new(
        CountingCompiler::default(),
        ShaderLibraryDesc {
            shader_dir: dir.to_path_buf(),
            cache_dir: dir.join("cache"),
            skip_cache: false,
            optimize: true,
        },
    )
}

fn touch_future(path: &Path) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
}

#[test]
fn test_second_compile_hits_cache() {
    let dir = temp_dir("hit");
    fs::write(dir.join("quad.vert"), "#version 450\nvoid main() {}\n").unwrap();

    let mut lib = library(&dir);
    let first = lib.compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    let second = lib.compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();

    assert_eq!(first, second);
    assert_eq!(lib.compiler().compiles, 1);
    assert_eq!(lib.compiler().optimizes, 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_fresh_library_reads_existing_cache() {
    let dir = temp_dir("fresh");
    fs::write(dir.join("quad.vert"), "void main() {}\n").unwrap();

    let first = library(&dir).compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    let mut lib = library(&dir);
    let second = lib.compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    assert_eq!(first, second);
    assert_eq!(lib.compiler().compiles, 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_corrupted_bytecode_is_recompiled() {
    let dir = temp_dir("corrupted");
    fs::write(dir.join("quad.vert"), "void main() {}\n").unwrap();

    let first = library(&dir).compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    let spv = fs::read_dir(dir.join("cache"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|e| e == "spv"))
        .unwrap();
    fs::write(&spv, [0xefu8, 0xbe, 0xad, 0xde, 1, 2, 3, 4]).unwrap();
    touch_future(&dir.join("cache").join("quad.vert.cache"));

    let mut lib = library(&dir);
    let second = lib.compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    assert_eq!(first, second);
    assert_eq!(lib.compiler().compiles, 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_macro_order_shares_cache_entry() {
    let dir = temp_dir("macro_order");
    fs::write(dir.join("blur.frag"), "void main() {}\n").unwrap();

    let mut lib = library(&dir);
    let a: ShaderMacros = [("SAMPLES", "4"), ("HDR", "")].into_iter().collect();
    let b: ShaderMacros = [("HDR", ""), ("SAMPLES", "4")].into_iter().collect();
    lib.compile("blur.frag", &a, ShaderStage::Fragment).unwrap();
    lib.compile("blur.frag", &b, ShaderStage::Fragment).unwrap();
    assert_eq!(lib.compiler().compiles, 1);

    let mut c = ShaderMacros::new();
    c.define_value("SAMPLES", 8);
    lib.compile("blur.frag", &c, ShaderStage::Fragment).unwrap();
    assert_eq!(lib.compiler().compiles, 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_touched_source_forces_recompile() {
    let dir = temp_dir("touched");
    let source = dir.join("quad.frag");
    fs::write(&source, "void main() {}\n").unwrap();

    let mut lib = library(&dir);
    lib.compile("quad.frag", &ShaderMacros::new(), ShaderStage::Fragment).unwrap();
    touch_future(&source);
    lib.compile("quad.frag", &ShaderMacros::new(), ShaderStage::Fragment).unwrap();
    assert_eq!(lib.compiler().compiles, 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_touched_include_forces_recompile() {
    let dir = temp_dir("touched_include");
    fs::write(dir.join("common.h"), "float shared_value;\n").unwrap();
    fs::write(dir.join("quad.frag"), "#include \"common.h\"\nvoid main() {}\n").unwrap();

    let mut lib = library(&dir);
    lib.compile("quad.frag", &ShaderMacros::new(), ShaderStage::Fragment).unwrap();
    assert!(lib.compiler().last_source.contains("shared_value"));

    let descriptor = fs::read_to_string(dir.join("cache").join("quad.frag.cache")).unwrap();
    assert!(descriptor.contains("common.h"));

    lib.compile("quad.frag", &ShaderMacros::new(), ShaderStage::Fragment).unwrap();
    assert_eq!(lib.compiler().compiles, 1);

    touch_future(&dir.join("common.h"));
    lib.compile("quad.frag", &ShaderMacros::new(), ShaderStage::Fragment).unwrap();
    assert_eq!(lib.compiler().compiles, 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_skip_cache_always_compiles_and_writes_nothing() {
    let dir = temp_dir("skip");
    fs::write(dir.join("quad.vert"), "void main() {}\n").unwrap();

    let mut lib = ShaderLibrary::new(
        CountingCompiler::default(),
        ShaderLibraryDesc {
            shader_dir: dir.clone(),
            cache_dir: dir.join("cache"),
            skip_cache: true,
            optimize: false,
        },
    );
    lib.compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    lib.compile("quad.vert", &ShaderMacros::new(), ShaderStage::Vertex).unwrap();
    assert_eq!(lib.compiler().compiles, 2);
    assert_eq!(lib.compiler().optimizes, 0);
    assert!(!dir.join("cache").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_compile_error_propagates() {
    let dir = temp_dir("error");
    fs::write(dir.join("bad.frag"), "syntax error\n").unwrap();

    let mut lib = library(&dir);
    let result = lib.compile("bad.frag", &ShaderMacros::new(), ShaderStage::Fragment);
    assert!(matches!(result, Err(Error::ShaderCompilationFailed(_))));
    assert!(!dir.join("cache").join("bad.frag.cache").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_source_is_io_error() {
    let dir = temp_dir("missing");
    let mut lib = library(&dir);
    let result = lib.compile("nope.vert", &ShaderMacros::new(), ShaderStage::Vertex);
    assert!(matches!(result, Err(Error::Io(_))));
    let _ = fs::remove_dir_all(&dir);
}
