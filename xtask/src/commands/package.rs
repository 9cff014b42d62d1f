// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::helpers::*;
use anyhow::{Context, Result};
use clap::Args;
use depot_core::{DepotConfig, FileSystem};
use depot_io::{BuiltinFileSystem, DirectoryPackageBuilder};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Configuration file providing the package name and checksum.
    #[arg(long, default_value = "Depot.toml")]
    pub config: PathBuf,
    /// Source directory. Defaults to `simulate_source`.
    #[arg(long)]
    pub source: Option<PathBuf>,
    /// Output package directory. Defaults to `builtin_root`.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Version to stamp. Derived from the content when omitted.
    #[arg(long)]
    pub version: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Configuration file providing the package name and checksum.
    #[arg(long, default_value = "Depot.toml")]
    pub config: PathBuf,
    /// Package directory to verify. Defaults to `builtin_root`.
    #[arg(long)]
    pub root: Option<PathBuf>,
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
}

pub fn pack(args: PackArgs) -> Result<()> {
    print_task_start("Packing Package", PACKAGE, MAGENTA);

    let config = DepotConfig::load(&args.config)
        .with_context(|| format!("Failed to load '{}'", args.config.display()))?;
    let source = args.source.unwrap_or_else(|| config.simulate_source.clone());
    let output = args.output.unwrap_or_else(|| config.builtin_root.clone());
    print_info(&format!(
        "Packing '{}' into '{}' as {} ({} checksums)",
        source.display(),
        output.display(),
        config.package_name,
        config.checksum
    ));

    let mut builder = DirectoryPackageBuilder::new(
        &source,
        &output,
        config.package_name.clone(),
        config.checksum,
    );
    if let Some(version) = args.version {
        builder = builder.with_version(version);
    }

    let manifest = runtime()?
        .block_on(builder.build_manifest())
        .with_context(|| format!("Failed to pack '{}'", source.display()))?;

    println!(
        "{}{} {} Wrote {} bundles ({:.2} MB) for version {}",
        BOLD,
        GREEN,
        CHECK,
        manifest.len(),
        manifest.total_size_bytes() as f64 / (1024.0 * 1024.0),
        manifest.resource_version()
    );
    print_success("Package built successfully.");
    Ok(())
}

pub fn verify(args: VerifyArgs) -> Result<()> {
    print_task_start("Verifying Package", SHIELD, CYAN);

    let config = DepotConfig::load(&args.config)
        .with_context(|| format!("Failed to load '{}'", args.config.display()))?;
    let root = args.root.unwrap_or_else(|| config.builtin_root.clone());
    let timeout = config.io_timeout();
    let package = BuiltinFileSystem::new(&root, config.package_name.clone(), config.checksum);

    let failures = runtime()?.block_on(async {
        package.init().await?;
        let version = package.load_resource_version(timeout).await?;
        let manifest = package.load_manifest(&version, timeout).await?;
        print_info(&format!(
            "Manifest {} {} lists {} bundles",
            manifest.package_name(),
            version,
            manifest.len()
        ));

        let mut failures = Vec::new();
        for bundle in manifest.bundles() {
            if let Err(e) = package.load_bundle_bytes(bundle, timeout).await {
                print_error(&e.to_string());
                failures.push(bundle.file_name.clone());
            }
        }
        Ok::<_, depot_core::DepotError>(failures)
    });
    let failures = failures.with_context(|| format!("Failed to verify '{}'", root.display()))?;

    if failures.is_empty() {
        print_success("Every bundle matches its manifest hash.");
        Ok(())
    } else {
        anyhow::bail!("{} bundles failed verification", failures.len())
    }
}
