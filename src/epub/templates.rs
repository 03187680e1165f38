//! Scaffolds of the auxiliary files of the book.

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
  <rootfiles>
    <rootfile full-path="package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

pub const PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid" xml:lang="en">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid"></dc:identifier>
    <dc:title id="title"></dc:title>
    <dc:language>en</dc:language>
    <dc:publisher>World Wide Web Consortium</dc:publisher>
    <dc:rights>Copyright © W3C® (MIT, ERCIM, Keio, Beihang). All rights reserved.</dc:rights>
    <dc:date></dc:date>
    <meta property="dcterms:modified"></meta>
    <meta property="dcterms:date"></meta>
  </metadata>
  <manifest>
  </manifest>
  <spine toc="ncx">
  </spine>
</package>
"#;

pub const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1" xml:lang="en">
  <head>
    <meta name="dtb:uid" content=""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle/>
  <docAuthor/>
  <navMap>
    <navPoint id="nav1" playOrder="1" class="h1">
      <navLabel><text>Cover</text></navLabel>
      <content src="cover.xhtml"/>
    </navPoint>
  </navMap>
</ncx>
"#;

pub const NAV: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en" xml:lang="en">
  <head>
    <meta charset="utf-8"/>
    <title></title>
    <meta name="date" content=""/>
    <link rel="stylesheet" type="text/css" href="Assets/base.css"/>
    <style type="text/css"></style>
  </head>
  <body>
    <nav epub:type="toc" id="toc">
      <h2>Table of Contents</h2>
      <ol id="toc_entries" class="toc">
        <li><a href="cover.xhtml" class="toc">Cover</a></li>
      </ol>
    </nav>
    <nav epub:type="landmarks" id="landmarks" hidden="hidden">
      <h2>Guide</h2>
      <ol>
        <li><a epub:type="cover" href="cover.xhtml">Cover</a></li>
        <li><a epub:type="toc" href="nav.xhtml#toc">Table of Contents</a></li>
        <li><a epub:type="bodymatter" href="Overview.xhtml">Begin Reading</a></li>
      </ol>
    </nav>
  </body>
</html>
"#;

/// Flat outline: entries carry short labels, numbers come from CSS counters.
pub const NAV_CSS_NUMBERING: &str = "
      #toc ol { list-style-type: none; counter-reset: entry; }
      #toc ol > li + li { counter-increment: entry; }
      #toc ol > li + li::before { content: counter(entry) \". \"; }
      a.toc { text-decoration: none; }
";

/// Rich outline copied from the document: labels already carry their numbers.
pub const NAV_CSS_NO_NUMBERING: &str = "
      #toc ol { list-style-type: none; }
      #toc a { text-decoration: none; }
";

pub const COVER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="en" xml:lang="en">
  <head>
    <meta charset="utf-8"/>
    <title></title>
    <meta name="author" content=""/>
    <link type="text/css" rel="stylesheet" href="Assets/base.css"/>
    <style type="text/css">
      body { padding: 2em !important; }
      h1 { text-align: center !important; font-size: 250%; }
      h2 { text-align: center !important; font-size: 180%; font-style: italic; }
      p.larger { font-size: 120%; }
      div#title { text-align: center; margin-top: 3em; }
      p.logo { margin-top: 2em; text-align: center; }
      p.disclaimer { font-style: italic; }
      a { text-decoration: none !important; }
    </style>
  </head>
  <body>
    <div id="title">
      <h1 id="btitle"></h1>
      <h2 id="subtitle"></h2>
      <p class="larger" id="editors"></p>
      <p class="larger" id="authors"></p>
      <p class="larger">World Wide Web Consortium (W3C)</p>
      <p class="logo"><a href="https://www.w3.org/"><img alt="W3C main logo" src="Assets/w3c_main.png"/></a></p>
      <p class="disclaimer">Note: this EPUB edition does <em>not</em> represent the authoritative text of the specification; please consult the <a id="ref_original" href="">original document</a> on the W3C Web Site.</p>
      <p class="copyright"><a href="https://www.w3.org/Consortium/Legal/ipr-notice#Copyright">Copyright</a>
      © of the original documents: <span id="cpdate"></span> W3C<sup>®</sup> (<a href="https://www.csail.mit.edu/">MIT</a>, <a href="https://www.ercim.eu/">ERCIM</a>,
      <a href="https://www.keio.ac.jp/">Keio</a>, <a href="https://ev.buaa.edu.cn/">Beihang</a>).<br/>
      All rights reserved. W3C <a href="https://www.w3.org/Consortium/Legal/ipr-notice#Legal_Disclaimer">liability</a>,
      <a href="https://www.w3.org/Consortium/Legal/ipr-notice#W3C_Trademarks">trademark</a>,
      and <a href="https://www.w3.org/Consortium/Legal/copyright-documents">document use</a> rules apply.</p>
    </div>
  </body>
</html>
"#;

/// `Assets/book.css`: page breaks plus the document type's padding and background.
pub fn book_css(padding: &str, background: Option<&str>) -> String {
    let mut css = format!(
        "h2 {{
  page-break-before: always;
  break-before: always;
}}

div.head h2 {{
  page-break-before: auto;
  break-before: auto;
}}

div[role=\"main\"] {{
  padding: {padding};
}}
"
    );
    if let Some(background) = background {
        // The stylesheet lives in Assets/, next to the background image.
        let image = background.strip_prefix("Assets/").unwrap_or(background);
        css.push_str(&format!(
            "
body {{
  background-image: url({image});
  background-position: top left;
  background-attachment: fixed;
  background-repeat: no-repeat;
}}
"
        ));
    }
    css
}
