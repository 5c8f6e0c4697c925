use std::{collections::BTreeMap, fs, num::NonZeroUsize};

use tsdg::{
    config::Config,
    generator::{Generator, writer::path_from_prefix},
};
use tsdg_payload::codec;

const CONFIG: &str = r#"
start: 2024-01-01T00:00:00Z
end: 2024-01-01T00:10:00Z
interval: 10
time_slice: 120
batch_size: 100
parallelism: 1
seed: 42
tags:
  - name: host
    type: STRING
    dist:
      type: weighted_preset
      preset:
        - value: a
          weight: 1
        - value: b
          weight: 2
        - value: c
          weight: 3
  - name: dc
    type: INTEGER
    nullability: 0.1
    dist:
      type: random_int
      lower_bound: 1
      upper_bound: 2
fields:
  - name: requests
    type: FLOAT
    dist:
      type: mono_inc
      step: 1
  - name: temperature
    type: FLOAT
    dist:
      type: normal
      mean: 40
      stddev: 5
"#;

type SeriesKey = Vec<(String, String)>;

#[tokio::test(flavor = "multi_thread")]
async fn generated_files_match_the_summary() {
    let dir = tempfile::tempdir().expect("directory could not be created");
    let prefix = dir.path().join("out");
    let config = Config::parse(CONFIG).expect("valid config");

    let generator = Generator::new(&config, &prefix, NonZeroUsize::new(3)).expect("valid run");
    let summary = generator.spin().await;
    assert!(summary.is_success());
    // 3 hosts x 2 dcs x 2 metrics, 60 ticks each.
    assert_eq!(summary.series, 12);
    assert_eq!(summary.samples, 12 * 60);

    let mut decoded_samples = 0;
    let mut by_series: BTreeMap<SeriesKey, Vec<(i64, f64)>> = BTreeMap::new();
    for index in 0..summary.files {
        let bytes = fs::read(path_from_prefix(&prefix, index)).expect("file exists");
        let request = codec::decode(&bytes).expect("decodes");
        for ts in request.timeseries {
            decoded_samples += ts.samples.len() as u64;
            let key = ts.labels.into_iter().map(|l| (l.name, l.value)).collect();
            by_series
                .entry(key)
                .or_default()
                .extend(ts.samples.into_iter().map(|s| (s.timestamp, s.value)));
        }
    }
    assert!(!path_from_prefix(&prefix, summary.files).exists());
    assert_eq!(
        fs::read_dir(dir.path()).expect("listable").count() as u64,
        summary.files
    );
    assert_eq!(decoded_samples, summary.samples);
    assert_eq!(by_series.len(), 12);

    let start = 1_704_067_200_i64;
    let expected_stamps: Vec<i64> = (0..60).map(|k| (start + k * 10) * 1000).collect();
    for (labels, mut samples) in by_series {
        samples.sort_by_key(|(ts, _)| *ts);
        let stamps: Vec<i64> = samples.iter().map(|(ts, _)| *ts).collect();
        assert_eq!(stamps, expected_stamps, "series {labels:?}");

        let name = labels
            .iter()
            .find(|(k, _)| k == "__name__")
            .map(|(_, v)| v.as_str());
        if name == Some("requests") {
            let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
            assert_eq!(values, (0..60).map(f64::from).collect::<Vec<_>>());
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn more_shards_than_series_is_fine() {
    let dir = tempfile::tempdir().expect("directory could not be created");
    let prefix = dir.path().join("out");
    let config = Config::parse(
        "start: 2024-01-01T00:00:00Z\nend: 2024-01-01T00:00:30Z\ninterval: 10\nfields:\n  - name: up\n    type: INTEGER\n    dist:\n      type: constant_int\n      value: 1\n",
    )
    .expect("valid config");

    let summary = Generator::new(&config, &prefix, NonZeroUsize::new(4))
        .expect("valid run")
        .spin()
        .await;
    assert!(summary.is_success());
    assert_eq!(summary.series, 1);
    assert_eq!(summary.samples, 3);
    assert_eq!(summary.files, 1);

    let bytes = fs::read(path_from_prefix(&prefix, 0)).expect("file exists");
    let request = codec::decode(&bytes).expect("decodes");
    assert!(
        request
            .timeseries
            .iter()
            .flat_map(|ts| &ts.samples)
            .all(|s| (s.value - 1.0).abs() < f64::EPSILON)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unwritable_output_fails_every_shard() {
    let dir = tempfile::tempdir().expect("directory could not be created");
    let prefix = dir.path().join("missing").join("out");
    let config = Config::parse(CONFIG).expect("valid config");

    let summary = Generator::new(&config, &prefix, NonZeroUsize::new(2))
        .expect("valid run")
        .spin()
        .await;
    assert!(!summary.is_success());
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.files, 0);
    assert_eq!(summary.samples, 0);
}
