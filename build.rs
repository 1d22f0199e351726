use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_files = ["./proto/bookmark.proto"];
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    tonic_build::configure()
        .out_dir(out_dir)
        .compile_protos(&proto_files, &["./proto"])?;

    rerun(&proto_files);
    println!("cargo:rerun-if-changed=migrations");

    Ok(())
}

fn rerun(proto_files: &[&str]) {
    for proto_file in proto_files {
        println!("cargo:rerun-if-changed={proto_file}");
    }
}
