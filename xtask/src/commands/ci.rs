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
use anyhow::Result;
use std::time::Instant;

/// One cargo invocation of the CI pipeline.
pub struct CiTask {
    pub name: &'static str,
    emoji: &'static str,
    color: &'static str,
    info: &'static str,
    args: &'static [&'static str],
}

pub const BUILD_TASK: CiTask = CiTask {
    name: "Build",
    emoji: HAMMER,
    color: BLUE,
    info: "Compiling the depot crates in debug mode",
    args: &["build", "--workspace", "--exclude", "xtask"],
};

pub const TEST_TASK: CiTask = CiTask {
    name: "Tests",
    emoji: TEST_TUBE,
    color: GREEN,
    info: "Running unit tests, integration tests and doc tests",
    args: &["test", "--workspace"],
};

pub const CHECK_TASK: CiTask = CiTask {
    name: "Check",
    emoji: MAGNIFIER,
    color: CYAN,
    info: "Checking code for errors without building executables",
    args: &["check", "--workspace"],
};

// `fmt` takes `--all`, not `--workspace`.
pub const FORMAT_TASK: CiTask = CiTask {
    name: "Format",
    emoji: BRUSH,
    color: MAGENTA,
    info: "Formatting code using rustfmt with default settings",
    args: &["fmt", "--all"],
};

pub const CLIPPY_TASK: CiTask = CiTask {
    name: "Clippy",
    emoji: CLIPPY,
    color: YELLOW,
    info: "Running Clippy linter with warnings as errors",
    args: &["clippy", "--workspace", "--", "-D", "warnings"],
};

pub fn run(task: &CiTask) -> Result<()> {
    print_task_start(task.name, task.emoji, task.color);
    print_info(task.info);
    execute_command("cargo", task.args, task.name)
}

/// Runs every task, keeps going past failures, and fails if any task did.
pub fn all() -> Result<()> {
    println!("{}", BANNER);
    println!(
        "{}💡 Pipeline:{} build → test → check → format → clippy",
        BOLD, RESET
    );

    let start_time = Instant::now();
    let tasks = [BUILD_TASK, TEST_TASK, CHECK_TASK, FORMAT_TASK, CLIPPY_TASK];
    let mut failed = Vec::new();

    for (i, task) in tasks.iter().enumerate() {
        println!(
            "\n{}{}[{}/{}] {} Phase{}",
            BOLD,
            BLUE,
            i + 1,
            tasks.len(),
            task.name,
            RESET
        );
        if run(task).is_err() {
            failed.push(task.name);
        }
    }

    println!(
        "\n{}{}Total time: {:.2}s{}",
        BOLD,
        BLUE,
        start_time.elapsed().as_secs_f64(),
        RESET
    );
    if failed.is_empty() {
        print_success(&format!("All {} tasks completed {}", tasks.len(), ROCKET));
        Ok(())
    } else {
        print_error(&format!("Failed tasks: {}", failed.join(", ")));
        anyhow::bail!("Pipeline failed: {}/{} tasks failed.", failed.len(), tasks.len())
    }
}
