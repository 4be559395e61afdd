use sage::{ResourceRequest, SageError};

use crate::support::Project;

#[test]
fn extension_overrides_base_file() {
    let project = Project::new();
    project.write("assets/home/views/index.xml", "<base/>");
    let ext = project.write("extensions/ext/assets/home/views/index.xml", "<ext/>");
    let context = project.context();

    let resolved = context
        .resolver
        .resolve(&ResourceRequest::new("home", "", "views/index.xml"))
        .unwrap();
    assert_eq!(resolved.physical_path, ext);
    assert_eq!(resolved.layer.name(), "ext");
    assert!(!resolved.is_locale_specific());
}

#[test]
fn layer_precedence_beats_locale_specificity() {
    let project = Project::new();
    project.write("assets/de/home/views/index.xml", "<base-de/>");
    let ext_generic = project.write("extensions/ext/assets/home/views/index.xml", "<ext/>");
    let context = project.context();

    let resolved = context
        .resolver
        .resolve(&ResourceRequest::new("home", "de", "views/index.xml"))
        .unwrap();
    assert_eq!(resolved.physical_path, ext_generic);
}

#[test]
fn localized_file_wins_within_a_layer() {
    let project = Project::new();
    project.write("assets/home/views/index.xml", "<generic/>");
    let localized = project.write("assets/de/home/views/index.xml", "<de/>");
    let context = project.context();

    let resolved = context
        .resolver
        .resolve(&ResourceRequest::new("home", "de", "views/index.xml"))
        .unwrap();
    assert_eq!(resolved.physical_path, localized);
    assert_eq!(resolved.locale.as_deref(), Some("de"));

    let generic = context
        .resolver
        .resolve(&ResourceRequest::new("home", "fr", "views/index.xml"))
        .unwrap();
    assert_eq!(generic.physical_path, project.root().join("assets/home/views/index.xml"));
}

#[test]
fn locale_fallback_is_used_before_generic_files() {
    let project = Project::new();
    project.write("assets/home/page.xml", "<generic/>");
    let de = project.write("assets/de/home/page.xml", "<de/>");
    let context = project.context();

    let resolved = context
        .resolver
        .resolve(&ResourceRequest::new("home", "de-CH", "page.xml"))
        .unwrap();
    assert_eq!(resolved.physical_path, de);
    assert_eq!(resolved.locale.as_deref(), Some("de"));
}

#[test]
fn not_found_lists_every_candidate() {
    let project = Project::new();
    let context = project.context();
    let request = ResourceRequest::new("home", "de", "views/missing.xml");

    let err = context.resolver.resolve(&request).unwrap_err();
    assert!(err.is_not_found());
    match &err {
        SageError::ResourceNotFound { request: failed, tried } => {
            assert_eq!(failed, &request);
            assert_eq!(tried.len(), 8);
            assert_eq!(tried[0].path, project.ext_root().join("assets/de/home/views/missing.xml"));
            assert_eq!(tried[0].layer, "ext");
            assert_eq!(tried[7].layer, "base");
            assert_eq!(tried.layers(), vec!["ext", "base"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("home/de/views/missing.xml"));
    assert!(message.contains("layers searched: ext > base"));
    assert!(message.contains("[base] "));
    assert!(message.contains("assets/views/missing.xml"));
}

#[test]
fn resolve_all_returns_one_match_per_layer() {
    let project = Project::new();
    let base = project.write("assets/de/dictionary/dictionary.xml", "<dictionary/>");
    let ext = project.write("extensions/ext/assets/dictionary/dictionary.xml", "<dictionary/>");
    project.write("extensions/ext/assets/dictionary.xml", "<dictionary/>");
    let context = project.context();

    let all = context
        .resolver
        .resolve_all(&ResourceRequest::new("dictionary", "de", "dictionary.xml"))
        .unwrap();
    let paths: Vec<_> = all.iter().map(|r| r.physical_path.clone()).collect();
    assert_eq!(paths, vec![ext, base]);
}

#[test]
fn list_category_maps_relative_paths_to_winners() {
    let project = Project::new();
    project.write("assets/home/views/index.xml", "<base/>");
    project.write("assets/home/views/about.xml", "<base/>");
    project.write("assets/de/home/views/contact.xml", "<de/>");
    let ext = project.write("extensions/ext/assets/home/views/index.xml", "<ext/>");
    project.write("assets/other/views/elsewhere.xml", "<other/>");
    let context = project.context();

    let listing = context.resolver.list_category("home", "de").unwrap();
    let names: Vec<&str> = listing.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["views/about.xml", "views/contact.xml", "views/index.xml"]
    );
    assert_eq!(listing["views/index.xml"].physical_path, ext);
    assert!(listing["views/contact.xml"].is_locale_specific());
}
