use super::*;
use std::collections::HashMap;

/// In-memory resolver
#[derive(Default)]
struct MapResolver {
    files: HashMap<String, String>,
    loads: usize,
    deps: Vec<PathBuf>,
}

impl MapResolver {
    fn with(files: &[(&str, &str)]) -> Self {
        Self {
            files: files.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Default::default()
        }
    }
}

impl IncludeResolver for MapResolver {
    fn load(&mut self, requested: &str) -> Result<String> {
        self.loads += 1;
        self.deps.push(PathBuf::from(requested));
        self.files
            .get(requested)
            .cloned()
            .ok_or_else(|| Error::ShaderCompilationFailed(format!("no include {}", requested)))
    }

    fn take_dependencies(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.deps)
    }
}

#[test]
fn test_parse_include_directive() {
    assert_eq!(parse_include_directive("#include \"common.h\""), Some("common.h"));
    assert_eq!(parse_include_directive("  #  include <lib/light.h>"), Some("lib/light.h"));
    assert_eq!(parse_include_directive("#define FOO"), None);
    assert_eq!(parse_include_directive("// #include \"x\""), None);
    assert_eq!(parse_include_directive("#include \"unterminated"), None);
}

#[test]
fn test_nested_includes_expand_in_place() {
    let mut resolver = MapResolver::with(&[("a.h", "#include \"b.h\"\nfloat a;"), ("b.h", "float b;")]);
    let out = expand_includes("#version 450\n#include \"a.h\"\nvoid main() {}", &mut resolver).unwrap();
    assert_eq!(out, "#version 450\nfloat b;\nfloat a;\nvoid main() {}\n");
    assert_eq!(resolver.take_dependencies(), vec![PathBuf::from("a.h"), PathBuf::from("b.h")]);
}

#[test]
fn test_repeated_include_expands_once() {
    let mut resolver = MapResolver::with(&[("c.h", "const float C = 1.0;")]);
    let out = expand_includes("#include \"c.h\"\n#include \"c.h\"\n", &mut resolver).unwrap();
    assert_eq!(out.matches("const float C").count(), 1);
    assert_eq!(resolver.loads, 1);
}

#[test]
fn test_missing_include_is_error() {
    let mut resolver = MapResolver::default();
    let err = expand_includes("#include \"gone.h\"", &mut resolver).unwrap_err();
    assert!(matches!(err, Error::ShaderCompilationFailed(_)));
}

#[test]
fn test_file_includer_caches_bodies_and_records_paths() {
    let dir = std::env::temp_dir().join(format!("meridian_include_test_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("common.h"), "float common;").unwrap();

    let mut includer = FileIncluder::new(&dir);
    assert_eq!(includer.load("common.h").unwrap(), "float common;");
    // The body stays cached even if the file changes on disk
    fs::write(dir.join("common.h"), "changed").unwrap();
    assert_eq!(includer.load("common.h").unwrap(), "float common;");
    assert_eq!(includer.cached(), 1);

    assert_eq!(includer.take_dependencies(), vec![dir.join("common.h")]);
    assert!(includer.take_dependencies().is_empty());

    let _ = fs::remove_dir_all(&dir);
}
