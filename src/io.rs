//! Readers for the clustering pipeline's tables and writers for the call,
//! classification and VCF outputs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use log::{info, warn};
use polars::prelude::*;
use rustc_hash::FxHashMap;

use crate::classify::ClassificationVerdict;
use crate::config::GenomeContext;
use crate::grouping::SpatialGrouping;
use crate::rusalt_structs::{BedInterval, BreakpointRange, EventKind, RawCluster, TypedEvent};
use crate::sorts;

fn read_tsv(path: &Path, has_header: bool) -> PolarsResult<DataFrame> {
    let parse_options = CsvParseOptions::default().with_separator(b'\t');
    CsvReadOptions::default()
        .with_has_header(has_header)
        .with_rechunk(true)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

fn i64_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<i64>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    column
        .i64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow!("missing value in column '{name}'")))
        .collect()
}

fn f64_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    column
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow!("missing value in column '{name}'")))
        .collect()
}

fn str_column(df: &DataFrame, name: &str) -> anyhow::Result<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    column
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string)
                .ok_or_else(|| anyhow!("missing value in column '{name}'"))
        })
        .collect()
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        other => bail!("cannot read '{other}' as a yes/no flag"),
    }
}

/// Joins the cluster table with the breakpoint table on `cluster`.
///
/// Clusters without a breakpoint row are skipped with a warning.
pub fn read_clusters(cluster_path: &Path, breakpoint_path: &Path) -> anyhow::Result<Vec<RawCluster>> {
    let clusters = read_tsv(cluster_path, true)
        .with_context(|| format!("reading cluster table {}", cluster_path.display()))?;
    let breakpoints = read_tsv(breakpoint_path, true)
        .with_context(|| format!("reading breakpoint table {}", breakpoint_path.display()))?;

    let bp_ids = str_column(&breakpoints, "cluster")?;
    let start_min = i64_column(&breakpoints, "del_start_min")?;
    let start_median = i64_column(&breakpoints, "del_start_median")?;
    let start_max = i64_column(&breakpoints, "del_start_max")?;
    let end_min = i64_column(&breakpoints, "del_end_min")?;
    let end_median = i64_column(&breakpoints, "del_end_median")?;
    let end_max = i64_column(&breakpoints, "del_end_max")?;

    let mut ranges: FxHashMap<String, (BreakpointRange, BreakpointRange)> = FxHashMap::default();
    for i in 0..bp_ids.len() {
        let start = BreakpointRange {
            min: start_min[i],
            median: start_median[i],
            max: start_max[i],
        };
        let end = BreakpointRange {
            min: end_min[i],
            median: end_median[i],
            max: end_max[i],
        };
        if ranges.insert(bp_ids[i].clone(), (start, end)).is_some() {
            warn!("Duplicate breakpoint row for cluster {}; keeping the last", bp_ids[i]);
        }
    }

    let ids = str_column(&clusters, "cluster")?;
    let alt_reads = i64_column(&clusters, "alt_reads")?;
    let ref_reads = i64_column(&clusters, "ref_reads")?;
    let heteroplasmy = f64_column(&clusters, "heteroplasmy")?;
    let dloop = str_column(&clusters, "dloop")?;

    let mut out = Vec::with_capacity(ids.len());
    for i in 0..ids.len() {
        let Some(&(start, end)) = ranges.get(&ids[i]) else {
            warn!("Cluster {} has no breakpoint row; skipping", ids[i]);
            continue;
        };
        out.push(RawCluster {
            cluster_id: ids[i].clone(),
            alt_reads: u64::try_from(alt_reads[i]).context("negative alt_reads")?,
            ref_reads: u64::try_from(ref_reads[i]).context("negative ref_reads")?,
            heteroplasmy: heteroplasmy[i],
            start,
            end,
            dloop: parse_flag(&dloop[i])
                .with_context(|| format!("dloop column of cluster {}", ids[i]))?,
        });
    }

    info!(
        "Read {} clusters from {}",
        out.len(),
        cluster_path.display()
    );
    Ok(out)
}

/// Reads a BED file (0-based half-open) into 1-based closed intervals,
/// sorted by start.
pub fn read_blacklist(path: &Path) -> anyhow::Result<Vec<BedInterval>> {
    let bed = read_tsv(path, false)
        .with_context(|| format!("reading blacklist {}", path.display()))?;
    if bed.width() < 3 {
        bail!("blacklist {} needs at least 3 columns", path.display());
    }

    let starts = i64_column(&bed, "column_2")?;
    let ends = i64_column(&bed, "column_3")?;
    let names = if bed.width() >= 4 {
        str_column(&bed, "column_4")?
    } else {
        (1..=starts.len()).map(|i| format!("blacklist_{i}")).collect()
    };

    let mut intervals: Vec<BedInterval> = Vec::with_capacity(starts.len());
    for i in 0..starts.len() {
        intervals.push(BedInterval {
            start: starts[i] + 1,
            end: ends[i],
            name: names[i].clone(),
        });
    }
    sorts::sort_intervals(&mut intervals);

    info!("Read {} blacklist intervals from {}", intervals.len(), path.display());
    Ok(intervals)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn event_columns(events: &[TypedEvent]) -> Vec<Column> {
    let flank = |f: fn(&TypedEvent) -> Option<String>| -> Vec<String> {
        events.iter().map(|e| f(e).unwrap_or_default()).collect()
    };

    vec![
        Column::new("sample".into(), events.iter().map(|e| e.sample.clone()).collect::<Vec<_>>()),
        Column::new("cluster".into(), events.iter().map(|e| e.cluster_id.clone()).collect::<Vec<_>>()),
        Column::new("alt_reads".into(), events.iter().map(|e| e.alt_reads).collect::<Vec<_>>()),
        Column::new("ref_reads".into(), events.iter().map(|e| e.ref_reads).collect::<Vec<_>>()),
        Column::new("heteroplasmy".into(), events.iter().map(|e| e.heteroplasmy).collect::<Vec<_>>()),
        Column::new("del_start_median".into(), events.iter().map(|e| e.raw_start).collect::<Vec<_>>()),
        Column::new("del_end_median".into(), events.iter().map(|e| e.raw_end).collect::<Vec<_>>()),
        Column::new("delsize".into(), events.iter().map(|e| e.size).collect::<Vec<_>>()),
        Column::new("final_event".into(), events.iter().map(|e| e.kind.to_string()).collect::<Vec<_>>()),
        Column::new("final_start".into(), events.iter().map(|e| e.final_start).collect::<Vec<_>>()),
        Column::new("final_end".into(), events.iter().map(|e| e.final_end).collect::<Vec<_>>()),
        Column::new("dloop".into(), events.iter().map(|e| yes_no(e.dloop)).collect::<Vec<_>>()),
        Column::new(
            "blacklist_crossing".into(),
            events
                .iter()
                .map(|e| e.blacklist_crossing.map_or("NA", yes_no))
                .collect::<Vec<_>>(),
        ),
        Column::new("seq1".into(), flank(|e| e.flanks.as_ref().map(|f| f.seq1.clone()))),
        Column::new("seq2".into(), flank(|e| e.flanks.as_ref().map(|f| f.seq2.clone()))),
        Column::new(
            "microhomology".into(),
            flank(|e| e.flanks.as_ref().and_then(|f| f.microhomology.clone())),
        ),
    ]
}

fn write_frame(path: &Path, mut df: DataFrame) -> anyhow::Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b'\t')
        .finish(&mut df)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// One row per called event.
pub fn write_call_tsv(path: &Path, events: &[TypedEvent]) -> anyhow::Result<()> {
    let df = DataFrame::new(event_columns(events))?;
    write_frame(path, df)
}

/// Call columns plus the spatial group of each event.
pub fn write_classify_metadata(
    path: &Path,
    events: &[TypedEvent],
    grouping: &SpatialGrouping,
) -> anyhow::Result<()> {
    grouping.check_covers(events.len())?;
    let mut columns = event_columns(events);
    columns.push(Column::new(
        "group".into(),
        (0..events.len())
            .map(|i| grouping.group_of(i).map_or_else(String::new, |g| g.id.clone()))
            .collect::<Vec<_>>(),
    ));
    write_frame(path, DataFrame::new(columns)?)
}

pub fn write_vcf(
    path: &Path,
    events: &[TypedEvent],
    context: &GenomeContext,
    contig: &str,
) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut f = BufWriter::new(file);

    writeln!(f, "##fileformat=VCFv4.2")?;
    writeln!(f, "##source=rusalt {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(f, "##contig=<ID={contig},length={}>", context.genome_length)?;
    writeln!(f, "##ALT=<ID=DEL,Description=\"Deletion\">")?;
    writeln!(f, "##ALT=<ID=DUP,Description=\"Duplication\">")?;
    writeln!(f, "##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of structural variant\">")?;
    writeln!(f, "##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position of the variant\">")?;
    writeln!(f, "##INFO=<ID=SVLEN,Number=1,Type=Integer,Description=\"Length of the variant\">")?;
    writeln!(f, "##INFO=<ID=HF,Number=1,Type=Float,Description=\"Heteroplasmy fraction\">")?;
    writeln!(f, "##INFO=<ID=DLOOP,Number=0,Type=Flag,Description=\"Breakpoint cluster crosses the D-loop\">")?;
    writeln!(f, "##INFO=<ID=BLCROSS,Number=0,Type=Flag,Description=\"Event overlaps a blacklisted region\">")?;
    writeln!(f, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;

    for e in events {
        let svlen = match e.kind {
            EventKind::Deletion => -e.size,
            EventKind::Duplication => e.size,
        };
        let mut info = format!(
            "SVTYPE={};END={};SVLEN={svlen};HF={:.4}",
            e.kind.svtype(),
            e.final_end,
            e.heteroplasmy / 100.0
        );
        if e.dloop {
            info.push_str(";DLOOP");
        }
        if e.crosses_blacklist() {
            info.push_str(";BLCROSS");
        }
        writeln!(
            f,
            "{contig}\t{}\t{}\tN\t<{}>\t.\tPASS\t{info}",
            e.final_start,
            e.cluster_id,
            e.kind.svtype()
        )?;
    }
    f.flush()?;
    info!("Wrote {} VCF records to {}", events.len(), path.display());
    Ok(())
}

/// Human-readable verdict plus its JSON form next to it.
pub fn write_report(
    text_path: &Path,
    json_path: &Path,
    verdict: &ClassificationVerdict,
) -> anyhow::Result<()> {
    let mut f = BufWriter::new(
        File::create(text_path).with_context(|| format!("creating {}", text_path.display()))?,
    );
    write!(f, "{verdict}")?;
    f.flush()?;

    let json = BufWriter::new(
        File::create(json_path).with_context(|| format!("creating {}", json_path.display()))?,
    );
    serde_json::to_writer_pretty(json, verdict)?;
    info!("Wrote {} and {}", text_path.display(), json_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::EventCaller;

    fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn joins_clusters_with_breakpoints() {
        let dir = tempfile::tempdir().unwrap();
        let clusters = write(
            dir.path(),
            "s.cluster",
            "cluster\talt_reads\tref_reads\theteroplasmy\tdloop\n\
             c1\t50\t150\t0.25\tno\n\
             c2\t5\t995\t0.005\tyes\n\
             c3\t9\t91\t0.09\tno\n",
        );
        let breakpoints = write(
            dir.path(),
            "s.breakpoint",
            "cluster\tdel_start_min\tdel_start_median\tdel_start_max\tdel_end_min\tdel_end_median\tdel_end_max\n\
             c1\t7990\t8000\t8010\t8995\t9000\t9004\n\
             c2\t16001\t16010\t16020\t480\t500\t505\n",
        );

        let raw = read_clusters(&clusters, &breakpoints).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].cluster_id, "c1");
        assert_eq!(raw[0].start.median, 8000);
        assert_eq!(raw[0].end.max, 9004);
        assert!(!raw[0].dloop);
        assert!(raw[1].dloop);
        assert_eq!(raw[1].alt_reads, 5);
    }

    #[test]
    fn bed_is_converted_to_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let bed = write(
            dir.path(),
            "bl.bed",
            "chrM\t3000\t3100\tsecond\nchrM\t300\t320\tfirst\n",
        );
        let intervals = read_blacklist(&bed).unwrap();
        assert_eq!(intervals[0].name, "first");
        assert_eq!((intervals[0].start, intervals[0].end), (301, 320));
        assert_eq!((intervals[1].start, intervals[1].end), (3001, 3100));
    }

    #[test]
    fn vcf_position_never_exceeds_end() {
        let caller = EventCaller::new(GenomeContext::default()).unwrap();
        let wrapped = RawCluster {
            cluster_id: "w1".to_string(),
            alt_reads: 30,
            ref_reads: 70,
            heteroplasmy: 0.3,
            start: BreakpointRange::point(16000),
            end: BreakpointRange::point(500),
            dloop: false,
        };
        let event = caller.call("s1", &wrapped).into_event().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.rusalt.vcf");
        write_vcf(&path, &[event], caller.context(), "chrM").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let record = text.lines().find(|l| !l.starts_with('#')).unwrap();
        assert!(record.starts_with("chrM\t500\tw1\tN\t<DUP>"));
        assert!(record.contains("SVTYPE=DUP;END=16000;SVLEN=15500;"));
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("Yes").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
