#![forbid(unsafe_code)]

use std::env;
use std::path::Path;
use std::process::Command;

fn main() {
    // Build metadata served by the version endpoint. Outside a git checkout
    // (e.g. building from a source tarball) the git values degrade to "unknown".
    if in_git_checkout() {
        build_data::set_GIT_BRANCH();
        build_data::set_GIT_COMMIT_SHORT();
        build_data::set_GIT_DIRTY();
        build_data::set_SOURCE_TIMESTAMP();  // Using BUILD_TIMESTAMP makes build unreproducible.
    } else {
        println!("cargo:rustc-env=GIT_BRANCH=unknown");
        println!("cargo:rustc-env=GIT_COMMIT_SHORT=unknown");
        println!("cargo:rustc-env=GIT_DIRTY=unknown");
        println!("cargo:rustc-env=SOURCE_TIMESTAMP=unknown");
    }
    build_data::set_RUSTC_VERSION();

    // Tells cargo not to rebuild build.rs during debug builds when other files change.
    // This speeds up development builds.
    //build_data::no_debug_rebuilds();
}

fn in_git_checkout() -> bool {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
    Path::new(&manifest_dir).join(".git").exists()
        && Command::new("git").arg("--version").output().is_ok()
}
