use server::openapi::ApiDoc;
use std::process::ExitCode;
use utoipa::OpenApi;

fn main() -> ExitCode {
    match ApiDoc::openapi().to_pretty_json() {
        Ok(spec) => {
            println!("{spec}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec to JSON: {e}");
            ExitCode::FAILURE
        }
    }
}
