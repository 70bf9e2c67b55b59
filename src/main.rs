use std::process::ExitCode;

use botgauge_hello::http::Response;
use botgauge_hello::middleware::AccessLog;
use botgauge_hello::server::Server;

const LISTEN_ADDR: &str = "0.0.0.0:8080";
const GREETING: &str = "Hello from Botgauge";

fn main() -> ExitCode {
    botgauge_hello::trace::init();

    let mut server = Server::new();
    server.middleware(AccessLog::new());
    server.route("/hello", |_req| async { Ok(Response::text(GREETING)) });

    match server.listen(LISTEN_ADDR) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server terminated");
            ExitCode::FAILURE
        }
    }
}
