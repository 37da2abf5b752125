fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    wterrain::run();

    #[cfg(target_arch = "wasm32")]
    {
        println!("WASM target - entry point is in lib.rs");
    }
}
