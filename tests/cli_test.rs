mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tr2epub() -> Command {
    Command::cargo_bin("tr2epub").unwrap()
}

/// Convert the on-disk example site into `<tmp>/out/example.epub`.
fn convert(tmp: &TempDir) -> std::path::PathBuf {
    let (page, doctypes) = common::disk_site(tmp.path());
    let output = tmp.path().join("out").join("example.epub");
    std::fs::create_dir_all(output.parent().unwrap()).unwrap();
    tr2epub()
        .args(["convert", page.as_str(), "--doctypes"])
        .arg(&doctypes)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    output
}

#[test]
fn test_convert_file_url() {
    let tmp = TempDir::new().unwrap();
    let output = convert(&tmp);

    let mut zip = common::open_zip(&output);
    let names = common::entry_names(&zip);
    assert_eq!(names[0], "mimetype");
    assert!(names.contains(&"css/print.css".to_string()));
    assert!(names.contains(&"diff.xhtml".to_string()));

    let css = common::entry_string(&mut zip, "Assets/book.css");
    assert!(css.contains("padding: 2em;"));
    assert!(!css.contains("background-image"));

    let nav = common::entry_string(&mut zip, "nav.xhtml");
    assert!(nav.contains("Overview.xhtml#intro"));
    assert!(nav.contains(r#"epub:type="landmarks""#));
}

#[test]
fn test_convert_json() {
    let tmp = TempDir::new().unwrap();
    let (page, doctypes) = common::disk_site(tmp.path());
    let output = tmp.path().join("example.epub");
    tr2epub()
        .args(["--json", "convert", page.as_str(), "--doctypes"])
        .arg(&doctypes)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"short_name\": \"example\""))
        .stdout(predicate::str::contains("\"doc_type\": \"WD\""));
}

#[test]
fn test_convert_temp_prints_path() {
    let tmp = TempDir::new().unwrap();
    let (page, doctypes) = common::disk_site(tmp.path());
    let assert = tr2epub()
        .args(["convert", page.as_str(), "--temp", "--doctypes"])
        .arg(&doctypes)
        .assert()
        .success()
        .stdout(predicate::str::ends_with("_example.epub\n"));

    let path = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let path = std::path::PathBuf::from(path.trim());
    assert!(path.exists());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_convert_folder_only() {
    let tmp = TempDir::new().unwrap();
    let (page, doctypes) = common::disk_site(tmp.path());
    let folder = tmp.path().join("mirror");
    tr2epub()
        .current_dir(tmp.path())
        .args(["convert", page.as_str(), "--no-package", "--doctypes"])
        .arg(&doctypes)
        .arg("--folder")
        .arg(&folder)
        .assert()
        .success();

    assert!(folder.join("package.opf").exists());
    assert!(folder.join("img/fig.png").exists());
    assert!(!tmp.path().join("example.epub").exists());
}

#[test]
fn test_no_package_requires_folder() {
    tr2epub()
        .args(["convert", "https://example.org/", "--no-package"])
        .assert()
        .failure();
}

#[test]
fn test_convert_missing_source() {
    let tmp = TempDir::new().unwrap();
    let missing = url::Url::from_file_path(tmp.path().join("nothing.html")).unwrap();
    tr2epub()
        .current_dir(tmp.path())
        .args(["convert", missing.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot retrieve"));
}

#[test]
fn test_check_valid() {
    let tmp = TempDir::new().unwrap();
    let output = convert(&tmp);
    tr2epub()
        .args(["check"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("Title:"));
}

#[test]
fn test_check_json() {
    let tmp = TempDir::new().unwrap();
    let output = convert(&tmp);
    tr2epub()
        .args(["check", "--json"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

#[test]
fn test_check_not_an_epub() {
    let tmp = TempDir::new().unwrap();
    let bogus = tmp.path().join("bogus.epub");
    std::fs::write(&bogus, "not a zip").unwrap();
    tr2epub().args(["check"]).arg(&bogus).assert().failure();
}

#[test]
fn test_pack_round_trip() {
    let tmp = TempDir::new().unwrap();
    let (page, doctypes) = common::disk_site(tmp.path());
    let folder = tmp.path().join("mirror");
    tr2epub()
        .args(["convert", page.as_str(), "--doctypes"])
        .arg(&doctypes)
        .arg("--folder")
        .arg(&folder)
        .arg("-o")
        .arg(tmp.path().join("first.epub"))
        .assert()
        .success();

    // Edits in the mirror end up in the repacked book.
    std::fs::write(folder.join("css/print.css"), "h1 { color: red; }").unwrap();
    let repacked = tmp.path().join("second.epub");
    tr2epub()
        .args(["pack"])
        .arg(&folder)
        .arg("-o")
        .arg(&repacked)
        .assert()
        .success();

    tr2epub().args(["check"]).arg(&repacked).assert().success();
    let mut zip = common::open_zip(&repacked);
    assert_eq!(common::entry_string(&mut zip, "css/print.css"), "h1 { color: red; }");
}

#[test]
fn test_pack_without_package() {
    let tmp = TempDir::new().unwrap();
    tr2epub()
        .args(["pack"])
        .arg(tmp.path())
        .arg("-o")
        .arg(tmp.path().join("x.epub"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("package.opf"));
}
