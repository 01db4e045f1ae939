//! Build script for fwports
//!
//! Embeds build-time information (git commit, dirty status, build timestamp)
//! used by `fwports --version`.

fn main() {
    // Re-run build if the default services source changes
    println!("cargo:rerun-if-env-changed=FWPORTS_SYSTEM_SERVICES_FILE");

    shadow_rs::ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build info");
}
