use std::path::Path;

use sage::{SageConfig, SageContext, SageError};

use crate::support::Project;

#[test]
fn context_from_file_resolves_relative_roots() {
    let project = Project::new();
    let config_path = project.write("sage.toml", &project.config_text());
    let ext = project.write("extensions/ext/assets/site.xml", "<ext/>");

    let context = SageContext::from_file(&config_path).unwrap();
    assert_eq!(context.registry.len(), 2);
    let resolved = context
        .resolver
        .resolve(&sage::ResourceRequest::new("", "", "site.xml"))
        .unwrap();
    assert_eq!(resolved.physical_path, ext);
}

#[test]
fn duplicate_install_orders_fail_at_startup() {
    let text = r#"
[[layers]]
name = "a"
root = "/a"
install_order = 1

[[layers]]
name = "b"
root = "/b"
install_order = 1
"#;
    let config = SageConfig::from_toml_str(text, "/").unwrap();
    let err = SageContext::from_config(&config).unwrap_err();
    assert!(matches!(err, SageError::Configuration { .. }));
    assert!(err.to_string().contains("install order"));
}

#[test]
fn missing_config_file_is_a_configuration_error() {
    let err = SageConfig::from_file(Path::new("/nonexistent/sage.toml")).unwrap_err();
    assert!(matches!(err, SageError::Configuration { .. }));
}
