//! Module containing structs generated from `proto/`

/// Prometheus remote-write protocol, as found in `prometheus/prompb`.
pub mod prometheus {
    #![allow(clippy::pedantic)]
    #![allow(missing_docs)]
    include!("proto/prometheus.rs");
}
