// Only include this file for non-WASM builds
#[cfg(not(target_arch = "wasm32"))]
mod main_impl {
    use fcl_client::cli::run_cli;

    pub fn main() -> std::process::ExitCode {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("Failed to start runtime: {e}");
                return std::process::ExitCode::FAILURE;
            }
        };
        match runtime.block_on(run_cli()) {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                std::process::ExitCode::FAILURE
            }
        }
    }
}

// Entry point that only exists for non-WASM builds
#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    main_impl::main()
}
