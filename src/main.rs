// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
// self
use supermarket::{
	CancellationToken,
	cli::{self, Args},
};

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	cli::init_tracing(args.verbose);

	let ctx = CancellationToken::new();

	tokio::spawn(cancel_on_signal(ctx.clone()));

	match cli::run(&args, &ctx).await {
		Ok(report) => {
			tracing::info!(
				fetched = report.fetched,
				failures = report.failures.len(),
				stats = %report.stats,
				"main: all done"
			);

			ExitCode::SUCCESS
		},
		Err(e) => {
			tracing::error!(error = %e, "main: run failed");

			ExitCode::FAILURE
		},
	}
}

async fn cancel_on_signal(ctx: CancellationToken) {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::warn!(error = %e, "main: ctrl-c handler unavailable");
			std::future::pending::<()>().await;
		}
	};
	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => {
				tracing::warn!(error = %e, "main: SIGTERM handler unavailable");
				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("main: received shutdown signal, cancelling run");
	ctx.cancel();
}
