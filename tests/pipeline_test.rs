use std::fs;
use std::path::{Path, PathBuf};

use civic_i18n::changelog::Changelog;
use civic_i18n::pipeline::{Pipeline, PipelineConfig, ScanOptions};
use civic_i18n::progress::ConsoleProgress;
use civic_i18n::quality::Detector;
use civic_i18n::table::{self, render_fresh, Lang, TranslationRow, TranslationTable};
use tempfile::TempDir;

const CONFIG: &str = r#"
[paths]
table = "assets/js/translations.js"

[prefixes]
"index.html" = "home"
"services/business-permit.html" = "bizpermit"
"#;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Solano</title>
  <script>var tpl = "<h2>Not me</h2>";</script>
</head>
<body>
  <h2>Services</h2>
  <p>8AM - 5PM</p>
  <p class="footer-version">v2.1.0</p>
</body>
</html>
"#;

const PERMIT: &str = r#"<main>
  <h1>Business Permit</h1>
  <p>Services</p>
</main>
"#;

struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("civic-i18n.toml"), CONFIG).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn page(&self, rel: &str, html: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, html).unwrap();
        path
    }

    fn table_path(&self) -> PathBuf {
        self.root().join("assets/js/translations.js")
    }

    fn write_table(&self, rows: Vec<TranslationRow>) {
        let mut t = TranslationTable::new();
        t.merge_insert(rows);
        fs::create_dir_all(self.table_path().parent().unwrap()).unwrap();
        fs::write(self.table_path(), render_fresh(&t)).unwrap();
    }

    fn table(&self) -> TranslationTable {
        let src = fs::read_to_string(self.table_path()).unwrap();
        table::load(&src).unwrap().table().clone()
    }

    fn pipeline(&self) -> Pipeline {
        let cfg = PipelineConfig::from_args(Some(self.root().join("civic-i18n.toml")), None)
            .unwrap();
        Pipeline::new(cfg, ConsoleProgress::new(false)).unwrap()
    }
}

fn placeholders_only() -> ScanOptions {
    ScanOptions {
        dry_run: false,
        translate: false,
    }
}

#[test]
fn scan_marks_heading_and_adds_placeholder_row() {
    let site = Site::new();
    let index = site.page("index.html", INDEX);

    let report = site.pipeline().scan(placeholders_only()).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.files_changed, 1);

    let html = fs::read_to_string(&index).unwrap();
    assert!(html.contains(r#"<h2 data-i18n="home-services">Services</h2>"#), "{html}");
    assert!(html.contains(r#"var tpl = "<h2>Not me</h2>";"#));
    assert!(html.contains("<p>8AM - 5PM</p>"));
    assert!(html.contains(r#"<p class="footer-version">v2.1.0</p>"#));

    let table = site.table();
    assert_eq!(table.len(), 1);
    for lang in Lang::ALL {
        assert_eq!(table.get(lang, "home-services"), Some("Services"));
    }
}

#[test]
fn rescan_changes_nothing() {
    let site = Site::new();
    let index = site.page("index.html", INDEX);
    site.page("services/business-permit.html", PERMIT);

    let pipeline = site.pipeline();
    let first = pipeline.scan(ScanOptions::default()).unwrap();
    assert!(first.inserted >= 2);
    let html_after_first = fs::read_to_string(&index).unwrap();
    let table_after_first = fs::read_to_string(site.table_path()).unwrap();

    let second = pipeline.scan(ScanOptions::default()).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.annotated, 0);
    assert_eq!(second.files_changed, 0);
    assert!(!second.table_written);
    assert_eq!(fs::read_to_string(&index).unwrap(), html_after_first);
    assert_eq!(fs::read_to_string(site.table_path()).unwrap(), table_after_first);
}

#[test]
fn scan_translates_new_rows_and_keeps_parity() {
    let site = Site::new();
    site.page("index.html", INDEX);
    let permit = site.page("services/business-permit.html", PERMIT);

    site.pipeline().scan(ScanOptions::default()).unwrap();

    let table = site.table();
    assert!(table.parity_gaps().is_empty());
    assert_eq!(table.get(Lang::Fil, "home-services"), Some("Mga Serbisyo"));
    assert_eq!(table.get(Lang::Ilo, "home-services"), Some("Dagiti Serbisio"));
    assert_eq!(
        table.get(Lang::Fil, "bizpermit-business-permit"),
        Some("Permiso sa Negosyo")
    );
    // same text on another page reuses the existing key
    let html = fs::read_to_string(permit).unwrap();
    assert!(html.contains(r#"<p data-i18n="home-services">Services</p>"#), "{html}");
}

#[test]
fn dry_run_writes_nothing() {
    let site = Site::new();
    let index = site.page("index.html", INDEX);

    let report = site
        .pipeline()
        .scan(ScanOptions {
            dry_run: true,
            translate: true,
        })
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert!(!report.table_written);
    assert_eq!(fs::read_to_string(index).unwrap(), INDEX);
    assert!(!site.table_path().exists());
    assert!(!site.root().join(".civic-i18n/changelog.jsonl").exists());
}

#[test]
fn existing_table_round_trips_and_grows_at_block_end() {
    let site = Site::new();
    site.write_table(vec![TranslationRow {
        key: "nav-home".into(),
        en: "Home".into(),
        fil: "Tahanan".into(),
        ilo: "Pagtaengan".into(),
    }]);
    let before = fs::read_to_string(site.table_path()).unwrap();
    site.page("index.html", INDEX);

    site.pipeline().scan(placeholders_only()).unwrap();

    let after = fs::read_to_string(site.table_path()).unwrap();
    assert!(after.starts_with("const translations = {\n    en: {\n        \"nav-home\": \"Home\","));
    assert!(after.contains("// === Auto-generated i18n keys ==="));
    let doc = table::load(&after).unwrap();
    assert_eq!(doc.serialize(doc.table()), after);
    let keys: Vec<&String> = doc.table().column(Lang::Ilo).keys().collect();
    assert_eq!(keys, vec!["nav-home", "home-services"]);
    assert_eq!(doc.table().get(Lang::Fil, "nav-home"), Some("Tahanan"));
    assert_ne!(before, after);
}

#[test]
fn broken_parity_aborts_before_any_write() {
    let site = Site::new();
    let broken = "const translations = {\n    en: {\n        \"a-one\": \"One\"\n    },\n    fil: {\n        \"a-one\": \"Isa\"\n    },\n    ilo: {\n    }\n};\n";
    fs::create_dir_all(site.table_path().parent().unwrap()).unwrap();
    fs::write(site.table_path(), broken).unwrap();
    let index = site.page("index.html", INDEX);

    let err = site.pipeline().scan(ScanOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("parity"), "{err:#}");
    assert_eq!(fs::read_to_string(index).unwrap(), INDEX);
    assert_eq!(fs::read_to_string(site.table_path()).unwrap(), broken);

    let report = site.pipeline().verify().unwrap();
    assert_eq!(report.parity_gaps, vec![(Lang::Ilo, "a-one".to_string())]);
    assert!(report.check().is_err());
}

#[test]
fn translate_fills_placeholders_only() {
    let site = Site::new();
    site.write_table(vec![
        TranslationRow::placeholder("home-services", "Services"),
        TranslationRow::placeholder("home-quiz", "Solano Quiz"),
        TranslationRow {
            key: "home-hours".into(),
            en: "Office Hours".into(),
            fil: "Oras ng Tanggapan".into(),
            ilo: "Oras ti Opisina".into(),
        },
    ]);

    let report = site.pipeline().translate().unwrap();
    assert_eq!(report.fil_filled, 1);
    assert_eq!(report.ilo_filled, 1);
    assert_eq!(report.kept, 2);

    let table = site.table();
    assert_eq!(table.get(Lang::Fil, "home-services"), Some("Mga Serbisyo"));
    assert_eq!(table.get(Lang::Fil, "home-quiz"), Some("Solano Quiz"));
    assert_eq!(table.get(Lang::Ilo, "home-quiz"), Some("Solano Quiz"));
    assert_eq!(table.get(Lang::Fil, "home-hours"), Some("Oras ng Tanggapan"));
}

#[test]
fn repair_never_increases_bad_count() {
    let site = Site::new();
    let en = "Access primary documents and official publications referenced";
    let stuck = "Quarterly zoning variance adjudication schedule";
    let stuck_fil = "Quarterly zoning variance adjudication iskedyul";
    site.write_table(vec![
        TranslationRow {
            key: "research-access".into(),
            en: en.into(),
            fil: "Access primary documents at official publications referenced".into(),
            ilo: "Access primary documents ken official publications referenced".into(),
        },
        TranslationRow {
            key: "zoning-schedule".into(),
            en: stuck.into(),
            fil: stuck_fil.into(),
            ilo: stuck.into(),
        },
    ]);

    let report = site.pipeline().repair().unwrap();
    assert_eq!(report.bad_fil_before, 2);
    assert_eq!(report.fil_fixed, 1);
    assert!(report.bad_fil_after <= report.bad_fil_before);
    assert!(report.bad_ilo_after <= report.bad_ilo_before);

    let table = site.table();
    let fixed = table.get(Lang::Fil, "research-access").unwrap();
    assert_ne!(fixed, "Access primary documents at official publications referenced");
    assert!(fixed.contains("pangunahing"), "{fixed}");
    assert_eq!(table.get(Lang::Fil, "zoning-schedule"), Some(stuck_fil));
    assert!(table.parity_gaps().is_empty());
}

#[test]
fn repair_leaves_unflagged_cells_alone_and_only_lowers_overlap() {
    let site = Site::new();
    let curated_ilo = "Sapulen dagiti kangrunaan a dokumento ken opisial a publikasion";
    site.write_table(vec![
        TranslationRow {
            key: "research-access".into(),
            en: "Access primary documents and official publications referenced".into(),
            fil: "Access primary documents at official publications referenced".into(),
            ilo: curated_ilo.into(),
        },
        TranslationRow {
            key: "permit-download".into(),
            en: "Download the official business permit application form".into(),
            fil: "I-download ang opisyal na porma ng aplikasyon para sa permit".into(),
            ilo: "Download the official business permit application porma".into(),
        },
        TranslationRow::placeholder(
            "permit-requirements",
            "Requirements for new business permit applications",
        ),
        TranslationRow {
            key: "home-services".into(),
            en: "Services".into(),
            fil: "Serbisyo".into(),
            ilo: "Serbisio".into(),
        },
    ]);
    let detector = Detector::default();
    let before = site.table();

    site.pipeline().repair().unwrap();
    let after = site.table();

    let old_rows: Vec<_> = before.rows().collect();
    for row in &old_rows {
        for lang in [Lang::Fil, Lang::Ilo] {
            let old = before.get(lang, &row.key).unwrap();
            let new = after.get(lang, &row.key).unwrap();
            if !detector.is_bad(&row.en, old) {
                assert_eq!(new, old, "{lang}:{} was not flagged", row.key);
                continue;
            }
            if new != old {
                let was = detector.english_overlap(&row.en, old).unwrap();
                let now = detector.english_overlap(&row.en, new).unwrap();
                assert!(now < was, "{lang}:{} overlap {was} -> {now}", row.key);
            }
        }
    }
    assert_eq!(after.get(Lang::Ilo, "research-access"), Some(curated_ilo));
    assert_ne!(
        after.get(Lang::Fil, "research-access"),
        before.get(Lang::Fil, "research-access")
    );
    assert_eq!(after.len(), before.len());
}

#[test]
fn sync_missing_adds_rows_for_unknown_markers() {
    let site = Site::new();
    site.write_table(vec![TranslationRow::placeholder("home-services", "Services")]);
    site.page(
        "index.html",
        r#"<h2 data-i18n="home-services">Services</h2>
<p data-i18n="home-hours">Office   Hours</p>
<p data-i18n="home-hours">Something else</p>
<span data-i18n="home-empty"></span>
"#,
    );

    let report = site.pipeline().sync_missing(false).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.without_text, vec!["home-empty".to_string()]);

    let table = site.table();
    assert_eq!(table.get(Lang::En, "home-hours"), Some("Office Hours"));
    assert_eq!(table.get(Lang::Fil, "home-hours"), Some("Oras ng Opisina"));
    assert!(!table.contains_key("home-empty"));

    let verify = site.pipeline().verify().unwrap();
    assert!(verify.check().is_ok());
    assert_eq!(verify.unknown_markers, vec!["home-empty".to_string()]);
}

#[test]
fn writing_passes_append_to_changelog() {
    let site = Site::new();
    site.page("index.html", INDEX);
    let pipeline = site.pipeline();

    pipeline.scan(placeholders_only()).unwrap();
    pipeline.translate().unwrap();
    pipeline.scan(placeholders_only()).unwrap();
    pipeline.verify().unwrap();

    let log = Changelog::new(site.root().join(".civic-i18n/changelog.jsonl"));
    let records = log.read_all().unwrap();
    let passes: Vec<&str> = records.iter().map(|r| r.pass.as_str()).collect();
    assert_eq!(passes, vec!["scan", "translate"]);
    assert!(records
        .iter()
        .all(|r| r.rules_fingerprint == pipeline.rules_fingerprint()));
    assert_eq!(records[0].counters.get("inserted"), Some(&1));
}
