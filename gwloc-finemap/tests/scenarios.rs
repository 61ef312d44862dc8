use std::path::PathBuf;

use gwloc_core::config::ColumnMap;
use gwloc_core::models::{Locus, LocusStatus, Variant};
use gwloc_core::{DropReason, GwlocConfig};
use gwloc_finemap::credible::{Scored, credible_set_from_scores};
use gwloc_finemap::{
    Extraction, FinemapError, LocusError, define_loci_from_variants, extract_windows, fine_map_loci,
    run_pipeline,
};
use gwloc_io::{FileSource, InMemorySource, SumstatsError, TableWrite, read_locus_table};
use pretty_assertions::assert_eq;
use rstest::*;

fn data_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../tests/data")
        .join(name)
}

fn sig(chr: &str, pos: u64, p: f64) -> Variant {
    Variant::new(chr, pos, "A", "G", 0.2, 0.03, p)
}

#[rstest]
fn test_distant_leads_form_two_loci() {
    let variants = vec![
        sig("chr1", 100, 1e-9),
        sig("chr1", 150, 1e-7),
        sig("chr1", 600_000, 1e-10),
    ];
    let source = InMemorySource::new(variants.clone());
    let def = define_loci_from_variants(variants, &GwlocConfig::default());

    assert_eq!(def.loci.len(), 2);

    // the most significant lead gets the first id
    let far = &def.loci[0];
    assert_eq!(far.lead_pos, 600_000);
    assert_eq!((far.interval.start, far.interval.end), (350_000, 850_000));

    let near = &def.loci[1];
    assert_eq!(near.lead_pos, 100);
    assert_eq!((near.interval.start, near.interval.end), (-249_900, 250_100));

    // p = 1e-7 misses the threshold, so it is absorbed through the window only
    assert_eq!(def.n_significant(), 2);
    assert!(near.contains("1", 150));
    let windows = extract_windows(&source, &def.loci).unwrap();
    let near_positions: Vec<u64> = windows[1].variants.iter().map(|v| v.pos).collect();
    assert_eq!(near_positions, vec![100, 150]);
    assert_eq!(windows[0].variants.len(), 1);
}

#[rstest]
fn test_significant_neighbour_is_assigned() {
    let def = define_loci_from_variants(
        vec![
            sig("chr1", 100, 1e-9),
            sig("chr1", 150, 1e-8),
            sig("chr1", 600_000, 1e-10),
        ],
        &GwlocConfig::default(),
    );
    assert_eq!(def.loci.len(), 2);
    let absorbed = def.assignments.iter().find(|a| a.pos == 150).unwrap();
    assert_eq!(absorbed.locus_id, def.loci[1].id);
    assert!(!absorbed.is_lead);
    assert_eq!(absorbed.distance_to_lead, 50);
}

#[rstest]
fn test_dominant_variant_is_singleton_set() {
    let variants: Vec<Variant> = (0..5).map(|i| sig("1", 1_000 + i, 0.5)).collect();
    let posteriors = [0.97, 0.01, 0.01, 0.005, 0.005];
    let scored: Vec<Scored> = variants
        .iter()
        .zip(posteriors)
        .map(|(variant, p)| Scored {
            variant,
            log_abf: f64::ln(p) + 42.0,
        })
        .collect();

    let cs = credible_set_from_scores(1, scored, 0.95);
    assert_eq!(cs.size(), 1);
    assert_eq!(cs.members()[0].pos, 1_000);
    assert!((cs.mass() - 0.97).abs() < 1e-9);
    assert!((cs.total_posterior() - 1.0).abs() < 1e-9);
}

#[rstest]
fn test_flat_posteriors_need_every_variant() {
    let variants: Vec<Variant> = (0..10)
        .map(|i| Variant::new("1", 1_000 + i * 10, "A", "G", 0.15, 0.03, 1e-6))
        .collect();
    let lead = variants[0].clone();
    let source = InMemorySource::new(variants);
    let locus = Locus::from_lead(1, &lead, 1_000);

    let out = fine_map_loci(
        &source,
        &[locus],
        &[1],
        &GwlocConfig::default(),
        Extraction::PerLocus,
    )
    .unwrap();
    let cs = &out.credible_sets[0];
    assert!(cs.rows.iter().all(|r| (r.posterior - 0.1).abs() < 1e-9));
    assert_eq!(cs.size(), 10);
}

#[rstest]
#[case(Extraction::SinglePass)]
#[case(Extraction::PerLocus)]
fn test_empty_window_is_no_data(#[case] extraction: Extraction) {
    let source = InMemorySource::new(vec![sig("1", 1_000, 1e-9)]);
    let present = Locus::from_lead(1, &sig("1", 1_000, 1e-9), 500);
    let absent = Locus::from_lead(2, &sig("7", 50_000, 1e-8), 500);

    let out = fine_map_loci(
        &source,
        &[present, absent],
        &[1, 1],
        &GwlocConfig::default(),
        extraction,
    )
    .unwrap();

    assert_eq!(out.credible_sets.len(), 1);
    assert!(out.credible_sets.iter().all(|cs| cs.locus_id == 1));
    assert_eq!(out.summaries[1].status, LocusStatus::NoData);
    assert_eq!(out.summaries[1].credible_set_size, None);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].locus_id, 2);
    assert_eq!(out.warnings[0].message, LocusError::NoData(2).to_string());
}

#[rstest]
#[case("sumstats.tsv")]
#[case("sumstats.tsv.gz")]
fn test_file_pipeline(#[case] name: &str) {
    let source = FileSource::new(data_file(name), ColumnMap::default()).unwrap();
    let out = run_pipeline(&source, &GwlocConfig::default(), Extraction::SinglePass).unwrap();

    let summary = &out.summary;
    assert_eq!(summary.n_rows, 9);
    assert_eq!(summary.n_significant, 3);
    assert_eq!(summary.n_loci, 2);
    assert_eq!(summary.n_fine_mapped, 2);
    assert_eq!(summary.dropped.get(DropReason::NonPositiveSe), 1);
    assert_eq!(summary.dropped.get(DropReason::MalformedRow), 1);

    let loci = &out.fine_mapped.summaries;
    assert_eq!(loci[0].locus.lead_id, "rs1001");
    assert_eq!(loci[0].n_significant, 2);
    assert_eq!(loci[0].n_window, 4);
    assert_eq!(loci[1].locus.lead_id, "rs2001");
    assert_eq!(loci[1].n_window, 2);
}

#[rstest]
#[case(Extraction::SinglePass)]
#[case(Extraction::PerLocus)]
fn test_text_in_effect_column_aborts_the_run(#[case] extraction: Extraction) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text_beta.tsv");
    std::fs::write(
        &path,
        "CHR\tPOS\tEA\tOA\tBETA\tSE\tP\n1\t100\tA\tG\tabc\t0.03\t1e-20\n1\t900000\tA\tG\tdef\t0.03\t1e-12\n",
    )
    .unwrap();
    let source = FileSource::new(&path, ColumnMap::default()).unwrap();

    match run_pipeline(&source, &GwlocConfig::default(), extraction) {
        Err(FinemapError::Input(SumstatsError::ColumnType { column, .. })) => {
            assert_eq!(column, "beta")
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(out) => panic!("run succeeded with {} loci", out.summary.n_loci),
    }
}

#[rstest]
fn test_locus_table_feeds_fine_mapping() {
    let source = FileSource::new(data_file("sumstats.tsv"), ColumnMap::default()).unwrap();
    let config = GwlocConfig::default();
    let full = run_pipeline(&source, &config, Extraction::PerLocus).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loci.tsv");
    full.fine_mapped.summaries.write_table_path(&path).unwrap();

    let table = read_locus_table(&path).unwrap();
    let loci: Vec<Locus> = table.iter().map(|s| s.locus.clone()).collect();
    let counts: Vec<usize> = table.iter().map(|s| s.n_significant).collect();
    assert_eq!(counts, vec![2, 1]);

    let again = fine_map_loci(&source, &loci, &counts, &config, Extraction::SinglePass).unwrap();
    assert_eq!(again.credible_sets, full.fine_mapped.credible_sets);
    assert_eq!(again.summaries, full.fine_mapped.summaries);
}

#[rstest]
fn test_definition_is_deterministic() {
    let variants: Vec<Variant> = (0..200u64)
        .map(|i| sig(if i % 3 == 0 { "2" } else { "1" }, (i * 7_919) % 3_000_000, 1e-9))
        .collect();
    let config = GwlocConfig::default();
    let a = define_loci_from_variants(variants.clone(), &config);
    let b = define_loci_from_variants(variants, &config);
    assert_eq!(a.loci, b.loci);
    assert_eq!(a.assignments, b.assignments);
}
