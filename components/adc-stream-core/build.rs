use std::path::PathBuf;

const DEFAULT_SAMPLE_INTERVAL_US: u32 = 4000;

fn main() {
    println!("cargo:rerun-if-env-changed=ADC_STREAM_SAMPLE_INTERVAL_US");

    let sample_interval_us = match std::env::var("ADC_STREAM_SAMPLE_INTERVAL_US") {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .expect("ADC_STREAM_SAMPLE_INTERVAL_US must be an unsigned integer (microseconds)"),
        Err(_) => DEFAULT_SAMPLE_INTERVAL_US,
    };
    assert!(sample_interval_us > 0, "ADC_STREAM_SAMPLE_INTERVAL_US must not be zero");

    let out_dir_path = PathBuf::from(std::env::var_os("OUT_DIR").unwrap());
    let out_file_path = out_dir_path.join("consts.rs");

    std::fs::write(
        out_file_path,
        format!(
            "
            // generated from env vars
            /// Time between two samples in microseconds.
            pub const SAMPLE_INTERVAL_US: u32 = {sample_interval_us};"
        ),
    )
    .unwrap();
}
