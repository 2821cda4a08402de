use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

fn odk_report_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_odk-report"))
}

/// Smallest workbook the reader accepts: shared strings for every cell.
fn write_workbook(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    let mut strings: Vec<String> = Vec::new();
    let mut index_of = |s: &str| -> usize {
        match strings.iter().position(|x| x == s) {
            Some(i) => i,
            None => {
                strings.push(s.to_string());
                strings.len() - 1
            }
        }
    };

    let mut parts: Vec<(String, String)> = Vec::new();
    let mut workbook = String::from(
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (name, rows)) in sheets.iter().enumerate() {
        let n = i + 1;
        workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Target="/xl/worksheets/sheet{n}.xml"/>"#
        ));
        let mut sheet = String::from(r#"<worksheet><sheetData>"#);
        for (r, row) in rows.iter().enumerate() {
            sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate() {
                let col = (b'A' + c as u8) as char;
                sheet.push_str(&format!(
                    r#"<c r="{col}{}" t="s"><v>{}</v></c>"#,
                    r + 1,
                    index_of(*cell)
                ));
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");
        parts.push((format!("xl/worksheets/sheet{n}.xml"), sheet));
    }
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let mut sst = String::from("<sst>");
    for s in &strings {
        sst.push_str(&format!(
            "<si><t>{}</t></si>",
            s.replace('&', "&amp;").replace('<', "&lt;")
        ));
    }
    sst.push_str("</sst>");

    parts.push(("xl/workbook.xml".to_string(), workbook));
    parts.push(("xl/_rels/workbook.xml.rels".to_string(), rels));
    parts.push(("xl/sharedStrings.xml".to_string(), sst));

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in parts {
        zip.start_file(name, options).expect("start zip entry");
        zip.write_all(body.as_bytes()).expect("write zip entry");
    }
    let bytes = zip.finish().expect("finish zip").into_inner();
    fs::write(path, bytes).expect("write workbook");
}

const SURVEY: &[&[&str]] = &[
    &["type", "name", "label"],
    &["text", "name", "Name"],
    &["select_one fruit", "fruit", "Hi ${name}, your fruit"],
];

const CHOICES: &[&[&str]] = &[&["list_name", "name", "label"], &["fruit", "a", "Apple"]];

fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let xml = dir.join("submission.xml");
    let xlsx = dir.join("form.xlsx");
    fs::write(
        &xml,
        "<data id=\"f\"><name>Ana</name><fruit>a</fruit><age>34</age></data>",
    )
    .expect("write submission");
    write_workbook(&xlsx, &[("survey", SURVEY), ("choices", CHOICES)]);
    (xml, xlsx)
}

#[test]
fn cli_writes_report_and_exits_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (xml, xlsx) = fixture(dir.path());
    let out = dir.path().join("report.html");

    let output = Command::new(odk_report_bin())
        .arg(&xml)
        .arg(&xlsx)
        .arg(&out)
        .env("NO_COLOR", "1")
        .output()
        .expect("run odk-report");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("wrote"));

    let html = fs::read_to_string(&out).expect("read report");
    assert_eq!(
        html,
        "<html><head><title>Submission Data</title></head><body>\
         <p><strong>Name:</strong> Ana</p>\
         <p><strong>Hi Ana, your fruit:</strong> Apple</p>\
         </body></html>"
    );
}

#[test]
fn cli_fails_on_missing_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (_, xlsx) = fixture(dir.path());
    let out = dir.path().join("report.html");

    let output = Command::new(odk_report_bin())
        .arg(dir.path().join("nope.xml"))
        .arg(&xlsx)
        .arg(&out)
        .output()
        .expect("run odk-report");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.xml"));
    assert!(!out.exists());
}

#[test]
fn cli_requires_three_arguments() {
    let output = Command::new(odk_report_bin())
        .arg("only-one.xml")
        .output()
        .expect("run odk-report");
    assert!(!output.status.success());
}

#[test]
fn cli_has_no_version_flag() {
    let output = Command::new(odk_report_bin())
        .arg("--version")
        .output()
        .expect("run odk-report");
    assert!(!output.status.success());

    let help = Command::new(odk_report_bin())
        .arg("--help")
        .output()
        .expect("run odk-report");
    assert!(help.status.success());
    assert!(!String::from_utf8_lossy(&help.stdout).contains("--version"));
}
