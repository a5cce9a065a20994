use anyhow::Context;
use papersync_cloud::{CloudClient, DeviceCredentials, PairingClient};
use tracing::info;

use crate::config::SyncConfig;
use crate::storage::PropertyStore;
use crate::sync::registry::{DEVICE_ID_KEY, DEVICE_TOKEN_KEY};

pub async fn load_credentials(
    store: &dyn PropertyStore,
) -> anyhow::Result<Option<DeviceCredentials>> {
    let device_token = store
        .get(DEVICE_TOKEN_KEY)
        .await
        .context("failed to read device token")?;
    let device_id = store
        .get(DEVICE_ID_KEY)
        .await
        .context("failed to read device id")?;
    Ok(match (device_id, device_token) {
        (Some(device_id), Some(device_token)) => Some(DeviceCredentials {
            device_id,
            device_token,
        }),
        _ => None,
    })
}

pub async fn save_credentials(
    store: &dyn PropertyStore,
    credentials: &DeviceCredentials,
) -> anyhow::Result<()> {
    store
        .put_all(&[
            (DEVICE_TOKEN_KEY.to_string(), credentials.device_token.clone()),
            (DEVICE_ID_KEY.to_string(), credentials.device_id.clone()),
        ])
        .await
        .context("failed to save device credentials")
}

/// Drops the stored pairing. The next run needs a fresh pairing code.
pub async fn forget_credentials(store: &dyn PropertyStore) -> anyhow::Result<()> {
    store.remove(DEVICE_TOKEN_KEY).await?;
    store.remove(DEVICE_ID_KEY).await?;
    Ok(())
}

/// Returns a document-storage client for this run, pairing the host first when
/// no credential is stored yet.
pub async fn connect(
    store: &dyn PropertyStore,
    config: &SyncConfig,
) -> anyhow::Result<CloudClient> {
    let pairing = match config.auth_url.as_deref() {
        Some(url) => PairingClient::with_base_url(url).context("invalid PAPERSYNC_AUTH_URL")?,
        None => PairingClient::new()?,
    };

    let credentials = match load_credentials(store).await? {
        Some(credentials) => credentials,
        None => pair_and_store(store, &pairing, config.pairing_code.as_deref()).await?,
    };

    let user_token = pairing
        .open_session(&credentials.device_token)
        .await
        .context("failed to open a device-cloud session")?;

    let client = match config.storage_url.as_deref() {
        Some(url) => {
            CloudClient::with_base_url(url, user_token).context("invalid PAPERSYNC_STORAGE_URL")?
        }
        None => CloudClient::new(user_token)?,
    };
    Ok(client)
}

async fn pair_and_store(
    store: &dyn PropertyStore,
    pairing: &PairingClient,
    code: Option<&str>,
) -> anyhow::Result<DeviceCredentials> {
    let code = code.context(
        "this host is not paired yet: set PAPERSYNC_PAIRING_CODE to a one-time code from the device cloud",
    )?;
    let credentials = pairing
        .register_device(code)
        .await
        .context("device pairing failed")?;
    // The one-time code is spent at this point.
    save_credentials(store, &credentials).await?;
    info!(device_id = %credentials.device_id, "host paired with the device cloud");
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::SyncMode;
    use crate::storage::memory_store;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, pairing_code: Option<&str>) -> SyncConfig {
        SyncConfig {
            source: "Books".into(),
            search_root: PathBuf::from("/tmp"),
            target_root: "Library".into(),
            mode: SyncMode::Update,
            skip_list: Vec::new(),
            pairing_code: pairing_code.map(str::to_string),
            force_update: false,
            db_path: PathBuf::from("/tmp/unused.db"),
            auth_url: Some(server.uri()),
            storage_url: Some(server.uri()),
        }
    }

    async fn mount_session(server: &MockServer, device_token: &str) {
        Mock::given(method("POST"))
            .and(path("/token/json/2/user/new"))
            .and(header("Authorization", format!("Bearer {device_token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("user-token"))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/document-storage/json/2/docs"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn pairs_once_and_saves_the_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token/json/2/device/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("device-token"))
            .expect(1)
            .mount(&server)
            .await;
        mount_session(&server, "device-token").await;
        let store = memory_store().await;

        let client = connect(&store, &config(&server, Some("abcd1234")))
            .await
            .unwrap();

        assert!(client.list_documents().await.unwrap().is_empty());
        let saved = load_credentials(&store).await.unwrap().unwrap();
        assert_eq!(saved.device_token, "device-token");
        assert_eq!(saved.device_id.len(), 36);
    }

    #[tokio::test]
    async fn stored_credential_skips_pairing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token/json/2/device/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("unused"))
            .expect(0)
            .mount(&server)
            .await;
        mount_session(&server, "stored-token").await;
        let store = memory_store().await;
        save_credentials(
            &store,
            &DeviceCredentials {
                device_id: "dev-1".into(),
                device_token: "stored-token".into(),
            },
        )
        .await
        .unwrap();

        connect(&store, &config(&server, None)).await.unwrap();
    }

    #[tokio::test]
    async fn unpaired_host_without_code_is_refused() {
        let server = MockServer::start().await;
        let store = memory_store().await;

        let err = connect(&store, &config(&server, None)).await.err().unwrap();

        assert!(err.to_string().contains("PAPERSYNC_PAIRING_CODE"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forgetting_removes_both_keys() {
        let store = memory_store().await;
        save_credentials(
            &store,
            &DeviceCredentials {
                device_id: "dev-1".into(),
                device_token: "token".into(),
            },
        )
        .await
        .unwrap();
        store.put("source-1", "stable-1").await.unwrap();

        forget_credentials(&store).await.unwrap();

        assert!(load_credentials(&store).await.unwrap().is_none());
        assert_eq!(store.get("source-1").await.unwrap().as_deref(), Some("stable-1"));
    }
}
