/// Command-line integration tests
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to write the cluster and breakpoint tables for one sample
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let cluster = dir.join("sample.cluster");
    fs::write(
        &cluster,
        "cluster\talt_reads\tref_reads\theteroplasmy\tdloop\n\
         c1\t250\t750\t0.25\tno\n\
         c2\t220\t780\t0.22\tno\n\
         c3\t180\t820\t0.18\tno\n\
         c4\t3\t997\t0.003\tno\n\
         c5\t40\t160\t0.20\tyes\n",
    )
    .unwrap();

    let breakpoint = dir.join("sample.breakpoint");
    fs::write(
        &breakpoint,
        "cluster\tdel_start_min\tdel_start_median\tdel_start_max\tdel_end_min\tdel_end_median\tdel_end_max\n\
         c1\t8465\t8470\t8475\t13440\t13447\t13450\n\
         c2\t8478\t8480\t8490\t13437\t13440\t13445\n\
         c3\t8495\t8500\t8510\t13455\t13460\t13462\n\
         c4\t3000\t3010\t3020\t4000\t4010\t4020\n\
         c5\t16100\t16110\t16120\t290\t300\t310\n",
    )
    .unwrap();

    (cluster, breakpoint)
}

#[test]
fn test_call_writes_tsv_and_vcf() {
    let tmpdir = TempDir::new().unwrap();
    let (cluster, breakpoint) = write_inputs(tmpdir.path());
    let out = tmpdir.path().join("out");

    Command::cargo_bin("rusalt")
        .unwrap()
        .arg("call")
        .arg("--prefix")
        .arg("sample")
        .arg("--output-dir")
        .arg(&out)
        .arg("--cluster")
        .arg(&cluster)
        .arg("--breakpoint")
        .arg(&breakpoint)
        .assert()
        .success();

    let tsv = fs::read_to_string(out.join("sample.rusalt_call.tsv")).unwrap();
    let mut lines = tsv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("sample\tcluster\t"));
    assert!(header.contains("final_event"));
    // c4 falls under the default het limit
    assert_eq!(lines.count(), 4);

    let vcf = fs::read_to_string(out.join("sample.rusalt.vcf")).unwrap();
    assert!(vcf.starts_with("##fileformat=VCFv4.2"));
    assert!(vcf.contains("SVTYPE=DEL;END=13447;SVLEN=-4977;HF=0.2500"));
    // c5 crosses the D-loop and overlaps OriH
    assert!(vcf.contains("chrM\t300\tc5\tN\t<DUP>"));
    assert!(vcf.contains(";DLOOP"));
}

#[test]
fn test_classify_reports_single() {
    let tmpdir = TempDir::new().unwrap();
    let (cluster, breakpoint) = write_inputs(tmpdir.path());
    let out = tmpdir.path().join("out");

    Command::cargo_bin("rusalt")
        .unwrap()
        .arg("classify")
        .arg("--prefix")
        .arg("sample")
        .arg("--output-dir")
        .arg(&out)
        .arg("--cluster")
        .arg(&cluster)
        .arg("--breakpoint")
        .arg(&breakpoint)
        .arg("--noise")
        .arg("1.0")
        .assert()
        .success();

    let report = fs::read_to_string(out.join("sample.rusalt_classify.txt")).unwrap();
    assert!(report.contains("Pattern: Single"));
    assert!(report.contains("Dominant group: G1"));

    let metadata = fs::read_to_string(out.join("sample.rusalt_classify_metadata.tsv")).unwrap();
    assert!(metadata.lines().next().unwrap().ends_with("\tgroup"));
    assert_eq!(metadata.lines().filter(|l| l.ends_with("\tG1")).count(), 3);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("sample.rusalt_classify.json")).unwrap())
            .unwrap();
    assert_eq!(json["pattern"], "Single");
    assert_eq!(json["criteria"]["n"], 4);
}

#[test]
fn test_missing_input_fails() {
    let tmpdir = TempDir::new().unwrap();

    Command::cargo_bin("rusalt")
        .unwrap()
        .arg("call")
        .arg("--prefix")
        .arg("sample")
        .arg("--output-dir")
        .arg(tmpdir.path())
        .arg("--cluster")
        .arg(tmpdir.path().join("missing.cluster"))
        .arg("--breakpoint")
        .arg(tmpdir.path().join("missing.breakpoint"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cluster table"));
}

#[test]
fn test_bad_classify_config_fails() {
    let tmpdir = TempDir::new().unwrap();
    let (cluster, breakpoint) = write_inputs(tmpdir.path());
    let config = tmpdir.path().join("classify.json");
    fs::write(&config, r#"{"dominant_fraction": 3.0}"#).unwrap();

    Command::cargo_bin("rusalt")
        .unwrap()
        .arg("classify")
        .arg("--prefix")
        .arg("sample")
        .arg("--output-dir")
        .arg(tmpdir.path())
        .arg("--cluster")
        .arg(&cluster)
        .arg("--breakpoint")
        .arg(&breakpoint)
        .arg("--classify-config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dominant_fraction"));
}
