//! Prints the `Aws` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use kube::CustomResourceExt;
use landing_zone_controller::crd::Aws;

fn main() -> Result<()> {
    let yaml = serde_yaml::to_string(&Aws::crd()).context("Failed to serialize Aws CRD")?;
    print!("{yaml}");
    Ok(())
}
