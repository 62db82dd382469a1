//! Library integration tests.

use depkit::DepkitError;

#[test]
fn error_types_are_public() {
    let err = DepkitError::ModuleCollision {
        name: "tool".into(),
        path: "/b/tool.py".into(),
        existing: "/a/tool.py".into(),
    };
    assert!(err.to_string().contains("tool"));
    assert!(err.is_dependency_error());
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> depkit::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use clap::Parser;
    use depkit::cli::{Cli, Commands};

    let cli = Cli::parse_from(["depkit", "deps", "scripts", "--json"]);

    if let Commands::Deps(args) = cli.command {
        assert!(args.json);
        assert_eq!(args.paths.len(), 1);
    } else {
        panic!("Expected Deps command");
    }
}

#[test]
fn metadata_api_is_public() {
    use depkit::metadata::{parse_dependencies, PythonVersion, VersionSpecifiers};

    let deps = parse_dependencies("# /// script\n# dependencies = [\"a\", \"b\"]\n# ///\n").unwrap();
    assert_eq!(deps, vec!["a", "b"]);

    let specs: VersionSpecifiers = ">=3.9, <4".parse().unwrap();
    assert!(specs.contains(&PythonVersion::new(3, 12, 0)));
}

#[test]
fn script_without_any_metadata_parses_empty() {
    let meta = depkit::metadata::parse_script_metadata("print('hello')\n").unwrap();
    assert!(meta.dependencies.is_empty());
    assert!(meta.requires_python.is_none());
}

#[test]
fn duplicate_blocks_are_a_script_error() {
    let content = "# /// script\n# dependencies = []\n# ///\nimport os\n\n# /// script\n# dependencies = []\n# ///\n";
    let err = depkit::metadata::parse_script_metadata(content).unwrap_err();
    assert_eq!(err.kind(), depkit::ErrorKind::Script);
    assert!(err.to_string().contains("Multiple script metadata blocks"));
}
