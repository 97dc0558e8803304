//! Mint an access token for local testing.
//!
//! Usage: `issue-token <user_id> <email> [--super-admin]`

use std::process::ExitCode;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(user_id), Some(email)) = (args.first(), args.get(1)) else {
        eprintln!("usage: issue-token <user_id> <email> [--super-admin]");
        return ExitCode::FAILURE;
    };
    let Ok(user_id) = user_id.parse::<i64>() else {
        eprintln!("user_id must be an integer, got {user_id:?}");
        return ExitCode::FAILURE;
    };
    let super_admin = args.iter().any(|a| a == "--super-admin");

    match server::auth::jwt::create_access_token(user_id, email, super_admin) {
        Ok(token) => {
            println!("{token}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to issue token: {e} (is JWT_SECRET set?)");
            ExitCode::FAILURE
        }
    }
}
