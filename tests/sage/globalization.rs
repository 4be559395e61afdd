use sage::{GlobalizeOutcome, ResourceRequest, SageError};

use crate::support::Project;

const PAGE: &str = r#"<page xmlns:intl="urn:sage:intl"><h1><intl:phrase ref="greeting.hello"/></h1><a href="/" intl:title="menu.home">Home</a><p><intl:phrase ref="greeting.missing">?</intl:phrase></p></page>"#;

fn dictionaries(project: &Project) {
    project.write(
        "assets/de/dictionary/dictionary.xml",
        r#"<dictionary>
  <phrase id="greeting.hello">Hallo</phrase>
  <phrase id="menu.home">Startseite</phrase>
</dictionary>"#,
    );
    project.write(
        "extensions/ext/assets/de/dictionary/dictionary.xml",
        r#"<dictionary><phrase id="greeting.hello">Servus</phrase></dictionary>"#,
    );
}

#[test]
fn dictionaries_merge_with_higher_layers_winning() {
    let project = Project::new();
    dictionaries(&project);
    let context = project.context();

    let dictionary = context.merger.dictionary("de").unwrap();
    assert_eq!(dictionary.get("greeting.hello"), Some("Servus"));
    assert_eq!(dictionary.get("menu.home"), Some("Startseite"));
    assert_eq!(dictionary.sources().len(), 2);
}

#[test]
fn globalize_substitutes_and_reports_missing_phrases() {
    let project = Project::new();
    dictionaries(&project);
    let context = project.context();

    let outcome = context.merger.globalize("views/page.xml", PAGE, "de").unwrap();
    let GlobalizeOutcome::Globalized { document, summary } = outcome else {
        panic!("page has placeholders");
    };
    assert!(document.contains(r#"<intl:phrase ref="greeting.hello">Servus</intl:phrase>"#));
    assert!(document.contains(r#"title="Startseite""#));
    assert!(document.contains(r#"<intl:phrase ref="greeting.missing">?</intl:phrase>"#));
    assert_eq!(summary.resource_name, "views/page.xml");
    assert_eq!(summary.locale, "de");
    assert!(summary.substituted_phrases.contains("greeting.hello"));
    assert!(summary.substituted_phrases.contains("menu.home"));
    assert_eq!(
        summary.missing_phrases.iter().collect::<Vec<_>>(),
        vec!["greeting.missing"]
    );
}

#[test]
fn globalizing_twice_gives_the_same_document() {
    let project = Project::new();
    dictionaries(&project);
    let context = project.context();

    let once = context.merger.globalize("page.xml", PAGE, "de").unwrap();
    let document = once.document().unwrap();
    let twice = context.merger.globalize("page.xml", document, "de").unwrap();
    assert_eq!(twice.document().unwrap(), document);

    let (first, second) = (once.summary().unwrap(), twice.summary().unwrap());
    assert_eq!(first.substituted_phrases, second.substituted_phrases);
    assert_eq!(first.missing_phrases, second.missing_phrases);
    assert_eq!(second.substituted_phrases.len(), 2);
}

#[test]
fn documents_without_placeholders_are_not_globalizable() {
    let project = Project::new();
    dictionaries(&project);
    let context = project.context();

    let outcome = context
        .merger
        .globalize("plain.xml", "<page><p>static</p></page>", "de")
        .unwrap();
    assert_eq!(outcome, GlobalizeOutcome::NotGlobalizable);
}

#[test]
fn missing_dictionary_reports_every_phrase_missing() {
    let project = Project::new();
    let context = project.context();

    let outcome = context.merger.globalize("page.xml", PAGE, "fr").unwrap();
    let summary = outcome.summary().unwrap();
    assert!(summary.substituted_phrases.is_empty());
    assert_eq!(summary.missing_phrases.len(), 3);
}

#[test]
fn dictionary_cache_follows_dictionary_edits() {
    let project = Project::new();
    dictionaries(&project);
    let context = project.context();

    let before = context.merger.dictionary("de").unwrap();
    project.rewrite(
        "extensions/ext/assets/de/dictionary/dictionary.xml",
        r#"<dictionary><phrase id="greeting.hello">Grüezi</phrase></dictionary>"#,
    );
    let after = context.merger.dictionary("de").unwrap();
    assert_eq!(before.get("greeting.hello"), Some("Servus"));
    assert_eq!(after.get("greeting.hello"), Some("Grüezi"));
}

#[test]
fn globalize_resource_resolves_through_the_overlay() {
    let project = Project::new();
    dictionaries(&project);
    project.write("assets/home/views/page.xml", PAGE);
    let context = project.context();

    let outcome = context
        .merger
        .globalize_resource(&ResourceRequest::new("home", "de", "views/page.xml"))
        .unwrap();
    assert!(outcome.is_globalizable());

    let broken = project.write("assets/home/views/broken.xml", "<page><intl:phrase/></page>");
    let err = context
        .merger
        .globalize_resource(&ResourceRequest::new("home", "de", "views/broken.xml"))
        .unwrap_err();
    match err {
        SageError::ResourceParse { path, .. } => assert_eq!(path, broken),
        other => panic!("unexpected error: {other}"),
    }
}
