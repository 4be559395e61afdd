use sage::BatchOptions;

use crate::support::Project;

fn project() -> Project {
    let project = Project::new();
    project.write(
        "assets/de/dictionary/dictionary.xml",
        r#"<dictionary>
  <phrase id="greeting.hello">Hallo</phrase>
  <phrase id="menu.home">Startseite</phrase>
</dictionary>"#,
    );
    project.write(
        "assets/home/views/index.xml",
        r#"<page><intl:phrase ref="greeting.hello"/><intl:phrase ref="menu.home"/></page>"#,
    );
    project.write(
        "extensions/ext/assets/home/views/about.xml",
        r#"<page><a intl:title="menu.home"/><intl:phrase ref="greeting.missing"/></page>"#,
    );
    project.write("assets/home/views/static.xml", "<page>static</page>");
    project.write("assets/home/views/broken.xml", "<page><intl:phrase/></page>");
    project.write("assets/home/styles/site.css", "body {}");
    project
}

#[test]
fn batch_report_collects_every_outcome() {
    let project = project();
    let context = project.context();

    let report = context
        .merger
        .globalize_category("home", "de", &BatchOptions::default())
        .unwrap();

    assert_eq!(report.category, "home");
    assert_eq!(report.locale, "de");
    let names: Vec<&str> = report
        .summaries
        .iter()
        .map(|s| s.resource_name.as_str())
        .collect();
    assert_eq!(names, vec!["views/about.xml", "views/index.xml"]);
    assert_eq!(report.not_globalizable, vec!["views/static.xml"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].resource, "views/broken.xml");

    let home_users: Vec<&str> = report.phrase_usage["menu.home"]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(home_users, vec!["views/about.xml", "views/index.xml"]);
    assert!(report.missing_phrases().contains("greeting.missing"));
    assert!(!report.is_clean());
}

#[test]
fn batch_writes_merged_documents_by_relative_path() {
    let project = project();
    let context = project.context();
    let out = tempfile::tempdir().unwrap();

    let options = BatchOptions {
        output_dir: Some(out.path().to_path_buf()),
        ..BatchOptions::default()
    };
    context
        .merger
        .globalize_category("home", "de", &options)
        .unwrap();

    let index = std::fs::read_to_string(out.path().join("views/index.xml")).unwrap();
    assert!(index.contains(r#"<intl:phrase ref="greeting.hello">Hallo</intl:phrase>"#));
    assert!(out.path().join("views/about.xml").is_file());
    assert!(!out.path().join("views/static.xml").exists());
    assert!(!out.path().join("views/broken.xml").exists());
}

#[test]
fn batch_report_serializes_to_json() {
    let project = project();
    let context = project.context();
    let options = BatchOptions {
        extensions: vec!["css".to_string()],
        ..BatchOptions::default()
    };

    let report = context
        .merger
        .globalize_category("home", "de", &options)
        .unwrap();
    assert!(report.summaries.is_empty());
    assert_eq!(report.not_globalizable, vec!["styles/site.css"]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["category"], "home");
    assert_eq!(json["not_globalizable"][0], "styles/site.css");
}
