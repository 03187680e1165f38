#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tr2epub::fetch::MemoryFetcher;
use url::Url;
use zip::ZipArchive;

pub const SPEC_URL: &str = "https://example.org/spec/index.html";

/// A ReSpec-configured Working Draft with one stylesheet chain, an image,
/// a sub-document and a structured table of contents.
pub const PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta http-equiv="Content-Type" content="text/html; charset=utf-8">
  <title>Example   Specification</title>
  <script id="initialUserConfig" type="application/json">
  {"specStatus": "WD", "shortName": "example", "publishDate": "2019-01-01",
   "editors": [{"name": "Ann Editor"}, {"name": "Bob Editor"}],
   "authors": [{"name": "Carl Author"}]}
  </script>
  <link rel="stylesheet" href="css/main.css">
</head>
<body>
  <div class="head"><img alt="W3C" src="https://www.w3.org/StyleSheets/TR/2016/logos/W3C"></div>
  <section id="toc"><h2>Table of Contents</h2><ol class="toc">
    <li class="tocline"><a href="#intro"><bdi class="secno">1. </bdi>Introduction</a></li>
    <li class="tocline"><a href="#model"><bdi class="secno">2. </bdi>Data model</a></li>
  </ol></section>
  <section id="intro"><h2>Introduction</h2>
    <p><img src="img/fig.png" alt="figure"></p>
    <p>See the <a href="diff.html#changes">changes</a> and <a href="#model">the model</a>.</p>
    <pre class="highlight">let x = 1;</pre>
  </section>
  <section id="model"><h2>Data model</h2><p>Nothing yet.</p></section>
</body>
</html>
"##;

pub const MAIN_CSS: &str = "@import url(print.css);\nbody { background: url(../img/bg.png); }\n";
pub const PRINT_CSS: &str = "@media print { h1 { color: black; } }\n";
pub const DIFF: &str = "<html><head><title>Diff</title></head><body><h1 id=\"changes\">Changes</h1></body></html>";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really";

/// The example page and everything it references, served from `base`.
pub fn site_files() -> Vec<(&'static str, &'static str, Vec<u8>)> {
    vec![
        ("index.html", "text/html", PAGE.as_bytes().to_vec()),
        ("css/main.css", "text/css", MAIN_CSS.as_bytes().to_vec()),
        ("css/print.css", "text/css", PRINT_CSS.as_bytes().to_vec()),
        ("img/fig.png", "image/png", PNG.to_vec()),
        ("img/bg.png", "image/png", PNG.to_vec()),
        ("diff.html", "text/html", DIFF.as_bytes().to_vec()),
    ]
}

/// The canonical assets every Working Draft transfers into the book.
pub fn canonical_assets() -> Vec<(&'static str, &'static str, Vec<u8>)> {
    vec![
        ("https://www.w3.org/Icons/w3c_main.png", "image/png", PNG.to_vec()),
        ("https://www.w3.org/StyleSheets/TR/base.css", "text/css", b"body { margin: 0; }".to_vec()),
        ("https://www.w3.org/StyleSheets/TR/logo-WD.png", "image/png", PNG.to_vec()),
    ]
}

/// In-memory web holding the example site below `https://example.org/spec/`.
pub fn memory_site() -> MemoryFetcher {
    let mut fetcher = MemoryFetcher::new();
    for (path, media_type, body) in site_files() {
        fetcher.insert(&format!("https://example.org/spec/{path}"), media_type, body);
    }
    for (url, media_type, body) in canonical_assets() {
        fetcher.insert(url, media_type, body);
    }
    fetcher
}

/// Write the example site into `root`, plus a document type table whose
/// transfers point at local copies of the canonical assets.
/// Returns the `file://` URL of the page and the path of the table.
pub fn disk_site(root: &Path) -> (Url, PathBuf) {
    let site = root.join("site");
    for (path, _, body) in site_files() {
        let target = site.join(path);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target, body).unwrap();
    }
    let assets = root.join("canonical");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("w3c_main.png"), PNG).unwrap();
    std::fs::write(assets.join("base.css"), "body { margin: 0; }").unwrap();

    let assets_url = Url::from_directory_path(&assets).unwrap();
    let doctypes = root.join("doctypes.yml");
    std::fs::write(
        &doctypes,
        format!(
            "types:\n  base:\n    subtitle: W3C Document\n    padding: 1em\n    transfer: &t\n      \
             - url: {assets_url}w3c_main.png\n        local: Assets/w3c_main.png\n      \
             - url: {assets_url}base.css\n        local: Assets/base.css\n  \
             WD:\n    uri_prefix: WD\n    subtitle: W3C Working Draft\n    padding: 2em\n    transfer: *t\n"
        ),
    )
    .unwrap();

    let page = Url::from_file_path(site.join("index.html")).unwrap();
    (page, doctypes)
}

pub fn open_zip(path: &Path) -> ZipArchive<File> {
    ZipArchive::new(File::open(path).expect("open epub")).expect("read epub")
}

pub fn entry_string(zip: &mut ZipArchive<File>, name: &str) -> String {
    let mut content = String::new();
    zip.by_name(name)
        .unwrap_or_else(|_| panic!("missing entry {name}"))
        .read_to_string(&mut content)
        .unwrap();
    content
}

pub fn entry_names(zip: &ZipArchive<File>) -> Vec<String> {
    (0..zip.len())
        .map(|i| zip.name_for_index(i).unwrap().to_string())
        .collect()
}
