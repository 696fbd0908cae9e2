use sessionward::prelude::*;

const STORE_PATH_VAR: &str = "SESSION_STORE";
const EMAIL_VAR: &str = "SESSION_EMAIL";
const PASSWORD_VAR: &str = "SESSION_PASSWORD";

#[tokio::main]
async fn main() -> Result<(), SessionwardError> {
    let _ = dotenvy::dotenv();
    sessionward::telemetry::init_tracing();

    let config = ClientConfig::from_env()?;
    let store_path =
        std::env::var(STORE_PATH_VAR).unwrap_or_else(|_| "session-cli.json".to_string());
    let client = SessionClient::builder()
        .config(config)
        .connect(FileStore::new(store_path))?;

    let session = client.load().await;
    if session.is_authenticated() {
        tracing::info!(role = ?session.role(), "restored stored session");
    } else {
        sign_in(&client).await?;
    }

    watch_until_ctrl_c(&client).await;

    client.shutdown().await?;
    tracing::info!("bye");
    Ok(())
}

async fn sign_in<T: HttpTransport, S: CredentialStore>(
    client: &SessionClient<T, S>,
) -> Result<(), SessionwardError> {
    let (Ok(email), Ok(password)) = (std::env::var(EMAIL_VAR), std::env::var(PASSWORD_VAR)) else {
        tracing::warn!("no stored session; set {EMAIL_VAR} and {PASSWORD_VAR} to log in");
        return Ok(());
    };

    match client.login(&email, &password).await {
        Ok(session) => {
            tracing::info!(role = ?session.role(), "logged in");
            Ok(())
        }
        Err(e) => {
            let reason = e.server_message().unwrap_or_else(|| e.to_string());
            tracing::error!(%reason, "login failed");
            Err(e.into())
        }
    }
}

/// Logs loop phase, banner, and session changes until Ctrl-C.
async fn watch_until_ctrl_c<T: HttpTransport, S: CredentialStore>(client: &SessionClient<T, S>) {
    let mut phase = client.phase();
    let mut banner = client.banner();
    let mut session = client.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = phase.changed() => {
                let phase = *phase.borrow_and_update();
                tracing::info!(%phase, "monitor phase");
            }
            Ok(()) = banner.changed() => {
                let banner = *banner.borrow_and_update();
                if banner.active {
                    tracing::warn!(title = banner.title(), message = %banner.message(), "banner");
                } else {
                    tracing::info!("connection restored");
                }
            }
            Ok(()) = session.changed() => {
                let authenticated = session.borrow_and_update().is_authenticated();
                if !authenticated {
                    tracing::info!("session ended");
                }
            }
        }
    }
}
