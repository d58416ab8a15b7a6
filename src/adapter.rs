use std::collections::BTreeMap;

use crate::decoder::DecodeOptions;
use crate::errors::SinkError;
use crate::sample::{SampleConsumer, SampleRecord};
use crate::sink::Sink;

/// Translates decoded samples into Prometheus-style appends: builds the
/// canonical metric name, attaches the decoder's labels plus any
/// caller-supplied ones, and flattens the value to f64.
pub struct MetricAdapter<'a, S: Sink> {
    sink: &'a S,
    metric_prefix: &'a str,
    extra_labels: &'a BTreeMap<String, String>,
}

impl<'a, S: Sink> MetricAdapter<'a, S> {
    pub fn new(sink: &'a S, options: &'a DecodeOptions) -> Self {
        MetricAdapter {
            sink,
            metric_prefix: &options.metric_prefix,
            extra_labels: &options.extra_labels,
        }
    }
}

impl<S: Sink> SampleConsumer for MetricAdapter<'_, S> {
    fn sample(&mut self, sample: SampleRecord<'_>) -> Result<(), SinkError> {
        let name = metric_name(self.metric_prefix, sample.resource_type, &sample.stat.name);

        let mut labels = self.extra_labels.clone();
        labels.insert("resource_type".to_string(), sample.resource_type.to_string());
        labels.insert("instance".to_string(), sample.instance_text_id.to_string());

        self.sink
            .append(&name, &labels, sample.timestamp_ms, sample.value.as_f64())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.sink.flush()
    }
}

/// Builds `<prefix>_<resource_type>_<stat>` with the canonical
/// normalisation: ASCII letters lowercased, every run of whitespace or `-`
/// folded into a single `_`.
pub fn metric_name(prefix: &str, resource_type: &str, stat_name: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + resource_type.len() + stat_name.len() + 2);
    name.push_str(prefix);
    name.push('_');
    normalize_into(&mut name, resource_type);
    name.push('_');
    normalize_into(&mut name, stat_name);
    name
}

fn normalize_into(out: &mut String, raw: &str) {
    let mut in_separator_run = false;
    for c in raw.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator_run {
                out.push('_');
                in_separator_run = true;
            }
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator_run = false;
        }
    }
}
