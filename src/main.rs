use std::process::ExitCode;
use vminfo::application::QueryVmUseCase;
use vminfo::domain::VmInfoError;
use vminfo::infrastructure::{RustlsCertificateSource, TextRenderer, VsphereSoapClient};
use vminfo::ports::Renderer;

enum Command {
    Run,
    Help,
    Version,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    rustls::crypto::ring::default_provider().install_default().ok();

    let args: Vec<String> = std::env::args().collect();

    match parse_args(&args) {
        Ok(Command::Run) => {}
        Ok(Command::Help) => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("vminfo {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, usage());
            return exit_code(&e);
        }
    }

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error[ERROR]: failed to create runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    rt.block_on(async_main())
}

fn parse_args(args: &[String]) -> Result<Command, VmInfoError> {
    match args.get(1).map(String::as_str) {
        None => Ok(Command::Run),
        Some("--help" | "-h") => Ok(Command::Help),
        Some("--version" | "-V") => Ok(Command::Version),
        Some(arg) if arg.starts_with('-') => Err(VmInfoError::usage(format!("unknown option: {}", arg))),
        Some(arg) => Err(VmInfoError::usage(format!("unexpected argument: {}", arg))),
    }
}

fn usage() -> String {
    "usage: vminfo\n\n\
    Prints a virtual machine's UUID, CPU/memory sizing, boot firmware and disk\n\
    backing files, plus the server's SHA-1 certificate thumbprint.\n\n\
    Environment:\n  \
      VCENTER_HOST      vCenter hostname or IP, no scheme (required)\n  \
      VCENTER_USERNAME  login user (required)\n  \
      VCENTER_PASSWORD  login password (required)\n  \
      VM_NAME           exact display name of the VM (required)\n  \
      VMINFO_TIMEOUT    per-step timeout (e.g. 10s, 3000ms) [default: 30s]\n  \
      RUST_LOG          log filter for stderr diagnostics [default: warn]".to_string()
}

async fn async_main() -> ExitCode {
    let management = match VsphereSoapClient::new() {
        Ok(m) => m,
        Err(e) => { eprintln!("{}", e); return exit_code(&e); }
    };

    let certs = match RustlsCertificateSource::new() {
        Ok(c) => c,
        Err(e) => { eprintln!("{}", e); return exit_code(&e); }
    };

    let use_case = QueryVmUseCase::new(management, certs);

    match use_case.run(|key| std::env::var(key).ok()).await {
        Ok(report) => {
            print!("{}", TextRenderer::new().render(&report));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            exit_code(&e)
        }
    }
}

fn exit_code(e: &VmInfoError) -> ExitCode {
    ExitCode::from(e.class.exit_code() as u8)
}
