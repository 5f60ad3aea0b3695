use assert_cmd::Command;
use dex_method_list::dex::DexBuilder;
use predicates::prelude::*;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn dex_method_list() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dex-method-list"))
}

fn params_image() -> Vec<u8> {
    DexBuilder::new()
        .method("LParams;", "test", &["Ljava/lang/String;", "[I"], "V")
        .method("LParams;", "<init>", &[], "V")
        .method("Ljava/lang/Object;", "<init>", &[], "V")
        .build()
}

fn outer_image() -> Vec<u8> {
    DexBuilder::new()
        .method("Lcom/example/Outer;", "access$000", &["Lcom/example/Outer;"], "I")
        .method("Lcom/example/Outer;", "run", &[], "V")
        .build()
}

fn obfuscated_image() -> Vec<u8> {
    DexBuilder::new()
        .method("La/b;", "a", &["La/b;", "I"], "V")
        .field("La/b;", "c", "Ljava/lang/String;")
        .build()
}

const MAPPING: &str = "\
# compiler: R8
com.example.Session -> a.b:
    java.lang.String token -> c
    1:4:void refresh(com.example.Session,int):20:23 -> a
";

fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).expect("write fixture");
    path
}

fn write_apk(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (entry, data) in entries {
        zip.start_file(*entry, SimpleFileOptions::default()).expect("start entry");
        zip.write_all(data).expect("write entry");
    }
    let bytes = zip.finish().expect("finish zip").into_inner();
    write_file(dir, name, &bytes)
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

const PARAMS: &str = "Params <init>()\nParams test(String, int[])\njava.lang.Object <init>()\n";
const OUTER: &str = "com.example.Outer access$000(Outer)\ncom.example.Outer run()\n";

#[test]
fn lists_a_dex_file() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "classes.dex", &params_image());

    dex_method_list()
        .arg(arg(&dex))
        .assert()
        .success()
        .stdout(PARAMS)
        .stderr("");
}

#[test]
fn lists_sources_in_argument_order() {
    let temp = TempDir::new().expect("tempdir");
    let params = write_file(&temp, "params.dex", &params_image());
    let outer = write_file(&temp, "outer.dex", &outer_image());

    dex_method_list()
        .args([arg(&outer), arg(&params)])
        .assert()
        .success()
        .stdout(format!("{OUTER}{PARAMS}"));
}

#[test]
fn lists_every_dex_in_an_apk() {
    let temp = TempDir::new().expect("tempdir");
    let apk = write_apk(
        &temp,
        "app.apk",
        &[
            ("AndroidManifest.xml", b"<manifest/>"),
            ("classes.dex", &params_image()),
            ("classes2.dex", &outer_image()),
        ],
    );

    dex_method_list()
        .arg(arg(&apk))
        .assert()
        .success()
        .stdout(format!("{PARAMS}{OUTER}"));
}

#[test]
fn reads_stdin_without_arguments() {
    dex_method_list()
        .write_stdin(outer_image())
        .assert()
        .success()
        .stdout(OUTER);
}

#[test]
fn hides_synthetic_numbers() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "outer.dex", &outer_image());

    dex_method_list()
        .args(["--hide-synthetic-numbers", arg(&dex)])
        .assert()
        .success()
        .stdout("com.example.Outer access(Outer)\ncom.example.Outer run()\n");
}

#[test]
fn missing_file_fails() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.dex");

    dex_method_list()
        .arg(arg(&missing))
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(format!("File {} not found.\n", arg(&missing)));
}

#[test]
fn decode_failure_keeps_earlier_output() {
    let temp = TempDir::new().expect("tempdir");
    let params = write_file(&temp, "params.dex", &params_image());
    let bad = write_file(
        &temp,
        "bad.dex",
        &DexBuilder::new().method("LBad;", "run", &["Q"], "V").build(),
    );
    let outer = write_file(&temp, "outer.dex", &outer_image());

    dex_method_list()
        .args([arg(&params), arg(&bad), arg(&outer)])
        .assert()
        .failure()
        .stdout(PARAMS)
        .stderr(predicate::str::contains("Unknown type: Q"));
}

#[test]
fn rejects_input_that_is_neither_dex_nor_zip() {
    let temp = TempDir::new().expect("tempdir");
    let junk = write_file(&temp, "notes.txt", b"plain text");

    dex_method_list()
        .arg(arg(&junk))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to read"));
}

#[test]
fn verbose_logs_to_stderr_only() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "classes.dex", &params_image());

    dex_method_list()
        .args(["-v", arg(&dex)])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(PARAMS)
        .stderr(predicate::str::contains("3 lines"));
}

#[test]
fn lists_fields_or_all_members() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "session.dex", &obfuscated_image());

    dex_method_list()
        .args(["--fields", arg(&dex)])
        .assert()
        .success()
        .stdout("a.b c: String\n");

    dex_method_list()
        .args(["--members", arg(&dex)])
        .assert()
        .success()
        .stdout("a.b a(b, int)\na.b c: String\n");

    dex_method_list()
        .args(["--fields", "--members", arg(&dex)])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn mapping_restores_original_names() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "session.dex", &obfuscated_image());
    let mapping = write_file(&temp, "mapping.txt", MAPPING.as_bytes());

    dex_method_list()
        .args(["--members", "--mapping", arg(&mapping), arg(&dex)])
        .assert()
        .success()
        .stdout("com.example.Session refresh(Session, int)\ncom.example.Session token: String\n");
}

#[test]
fn missing_mapping_fails_before_listing() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "session.dex", &obfuscated_image());
    let missing = temp.path().join("mapping.txt");

    dex_method_list()
        .args(["--mapping", arg(&missing), arg(&dex)])
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(format!("File {} not found.\n", arg(&missing)));
}

#[test]
fn malformed_mapping_names_the_line() {
    let temp = TempDir::new().expect("tempdir");
    let dex = write_file(&temp, "session.dex", &obfuscated_image());
    let mapping = write_file(&temp, "mapping.txt", b"com.example.Session a.b\n");

    dex_method_list()
        .args(["--mapping", arg(&mapping), arg(&dex)])
        .assert()
        .failure()
        .stderr("Unable to parse line 1 as type mapping: com.example.Session a.b\n");
}
