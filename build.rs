use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only the native backend links anything.
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    println!("cargo:rerun-if-env-changed=SHORE_LIB_DIR");
    match env::var_os("SHORE_LIB_DIR") {
        Some(dir) => println!("cargo:rustc-link-search=native={}", PathBuf::from(dir).display()),
        None => println!("cargo:warning=SHORE_LIB_DIR is not set, relying on the system linker path for libshore_c"),
    }
}
