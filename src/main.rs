fn main() {
    if let Err(err) = wgpu_shadow_skinning::run() {
        eprintln!("Application error: {err}");
    }
}
