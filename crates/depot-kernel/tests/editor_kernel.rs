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

use depot_core::{BuildMode, DepotConfig, DepotError, ManifestBundle, ResourceName};
use depot_kernel::{Kernel, KernelServices, ResourceKernel, UpdateOptions};

fn editor_config(root: &std::path::Path) -> DepotConfig {
    DepotConfig {
        mode: BuildMode::EditorSimulate,
        package_name: "Main".into(),
        simulate_source: root.join("assets"),
        simulate_output: root.join("simulated"),
        ..DepotConfig::default()
    }
}

#[tokio::test]
async fn editor_kernel_serves_freshly_built_sources() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("assets/ui"))?;
    std::fs::write(dir.path().join("assets/ui/button_pressed.png"), "pixels")?;
    std::fs::write(dir.path().join("assets/intro.txt"), "once upon a time")?;

    let kernel = Kernel::from_config(&editor_config(dir.path()), KernelServices::default())?;
    kernel.init().await?;

    let state = kernel.state().expect("initialized");
    assert_eq!(state.manifest().len(), 2);
    assert!(kernel.get_updatable_bundles().await?.is_empty());
    assert_eq!(kernel.load_asset_by_path("intro.txt").await?, b"once upon a time");
    Ok(())
}

#[tokio::test]
async fn editor_kernel_picks_up_source_changes_on_next_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("assets"))?;
    std::fs::write(dir.path().join("assets/level.map"), "v1")?;
    let config = editor_config(dir.path());

    let first = Kernel::from_config(&config, KernelServices::default())?;
    first.init().await?;
    let first_version = first.state().unwrap().version().clone();

    std::fs::write(dir.path().join("assets/level.map"), "v2")?;
    let second = Kernel::from_config(&config, KernelServices::default())?;
    second.init().await?;

    assert_ne!(second.state().unwrap().version(), &first_version);
    let address = ResourceName::new("level", None::<String>, "map");
    assert_eq!(second.load_asset_by_address(&address).await?, b"v2");
    Ok(())
}

#[tokio::test]
async fn editor_kernel_refuses_downloads() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("assets"))?;
    std::fs::write(dir.path().join("assets/a.bin"), "a")?;
    let kernel = Kernel::from_config(&editor_config(dir.path()), KernelServices::default())?;
    kernel.init().await?;

    let empty = kernel.update_bundles(&[], UpdateOptions::default()).await?;
    assert_eq!(empty.total(), 0);

    let bundle = ManifestBundle::new("a.bin", "00", 1);
    let err = kernel
        .update_bundles(&[bundle], UpdateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DepotError::Unsupported { .. }));
    Ok(())
}

#[tokio::test]
async fn editor_kernel_fails_init_without_sources() {
    let dir = tempfile::tempdir().unwrap();
    let kernel =
        Kernel::from_config(&editor_config(dir.path()), KernelServices::default()).unwrap();
    let err = kernel.init().await.unwrap_err();
    assert!(err.is_not_found());
    assert!(kernel.state().is_none());
}
