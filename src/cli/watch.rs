use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use log::info;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, Lines},
    time::Duration,
};

use crate::{
    build::read_manifest,
    host::{ClientHost, ReloadSignal, StorageHost},
    presentation::{BannerPosition, PromptAction, PromptView, UpdateBanner, UpdatePresenter},
    version::{
        compiled_identity, HttpVersionFetcher, ProviderOptions, VersionFetcher, VersionHandle,
        VersionProvider, VersionRecord,
    },
};

pub struct WatchSettings {
    pub origin: String,
    pub endpoint: String,
    pub interval: Duration,
    /// Manifest describing the running build; re-read on every reload.
    pub current_manifest: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub local_storage: PathBuf,
    pub banner: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Check,
    Press(PromptAction),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "c" | "check" => Some(Command::Check),
        "r" | "reload" => Some(Command::Press(PromptAction::Reload)),
        "h" | "hard" => Some(Command::Press(PromptAction::HardReload)),
        "d" | "dismiss" => Some(Command::Press(PromptAction::Dismiss)),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

enum SessionEnd {
    Reload,
    Quit,
}

/// Watches a deployed origin from the terminal. Each reload remounts the
/// watcher with a freshly read identity, the way a page reload would.
pub async fn watch(settings: WatchSettings) -> Result<()> {
    let fetcher: Arc<dyn VersionFetcher> =
        Arc::new(HttpVersionFetcher::new(&settings.origin, &settings.endpoint)?);
    let (host, mut reload_rx) =
        StorageHost::new(settings.cache_dir.clone(), settings.local_storage.clone())?;
    let host: Arc<dyn ClientHost> = Arc::new(host);
    let mut input = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("Commands: [c]heck  [r]eload  [h]ard reload  [d]ismiss  [q]uit");

    loop {
        let current = current_identity(&settings)?;
        info!(
            "Watching {}{} as build {} ({})",
            settings.origin, settings.endpoint, current.build_id, current.version
        );

        let provider = VersionProvider::mount(
            provider_options(&settings, current),
            Arc::clone(&fetcher),
            Arc::clone(&host),
        );
        let end = run_session(provider.handle(), &mut reload_rx, &mut input).await;
        provider.unmount();

        match end? {
            SessionEnd::Reload => println!("Reloading..."),
            SessionEnd::Quit => return Ok(()),
        }
    }
}

fn provider_options(settings: &WatchSettings, current: VersionRecord) -> ProviderOptions {
    let presenter: Option<Arc<dyn UpdatePresenter>> = if settings.banner {
        Some(Arc::new(UpdateBanner::new(BannerPosition::Top)))
    } else {
        None
    };

    ProviderOptions {
        interval: settings.interval,
        current,
        auto_prompt: true,
        prompt_message: settings.message.clone(),
        presenter,
    }
}

fn current_identity(settings: &WatchSettings) -> Result<VersionRecord> {
    match &settings.current_manifest {
        Some(path) => read_manifest(path),
        None => Ok(compiled_identity()),
    }
}

/// `input` outlives the session so a line typed across a reload is kept.
async fn run_session<R>(
    handle: VersionHandle,
    reload_rx: &mut ReloadSignal,
    input: &mut Lines<R>,
) -> Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
{
    let mut updates = handle.subscribe()?;
    let mut shown: Option<PromptView> = None;
    let _ = reload_rx.borrow_and_update();

    loop {
        // next_line keeps partial input buffered when another branch wins.
        tokio::select! {
            biased;

            _ = reload_rx.changed() => return Ok(SessionEnd::Reload),
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(SessionEnd::Quit);
                }
                let view = handle.prompt().await?;
                if view != shown {
                    match &view {
                        Some(view) => println!("\n{view}\n"),
                        None if shown.is_some() => println!("Update prompt hidden"),
                        None => {}
                    }
                    shown = view;
                }
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(SessionEnd::Quit);
                };
                match parse_command(&line) {
                    Some(Command::Check) => handle.check_now().await?,
                    Some(Command::Press(action)) => handle.press(action).await?,
                    Some(Command::Quit) => return Ok(SessionEnd::Quit),
                    None => println!("Unknown command: {}", line.trim()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::write_manifest;
    use tokio::io::AsyncWriteExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_single_letter_commands() {
        assert_eq!(parse_command("c\n"), Some(Command::Check));
        assert_eq!(
            parse_command(" h "),
            Some(Command::Press(PromptAction::HardReload))
        );
        assert_eq!(
            parse_command("dismiss"),
            Some(Command::Press(PromptAction::Dismiss))
        );
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("x"), None);
    }

    #[tokio::test]
    async fn session_ends_on_reload_press() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app-version.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"version":"1.1.0","buildId":"xyz789"}"#),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let current_path = write_manifest(dir.path(), &VersionRecord::new("1.0.0", "abc123")).unwrap();
        let settings = WatchSettings {
            origin: server.uri(),
            endpoint: "/app-version.json".into(),
            interval: Duration::from_secs(60),
            current_manifest: Some(current_path),
            cache_dir: dir.path().join("caches"),
            local_storage: dir.path().join("local.json"),
            banner: true,
            message: None,
        };

        let fetcher: Arc<dyn VersionFetcher> =
            Arc::new(HttpVersionFetcher::new(&settings.origin, &settings.endpoint).unwrap());
        let (host, mut reload_rx) =
            StorageHost::new(settings.cache_dir.clone(), settings.local_storage.clone()).unwrap();
        let provider = VersionProvider::mount(
            provider_options(&settings, current_identity(&settings).unwrap()),
            fetcher,
            Arc::new(host),
        );
        let handle = provider.handle();
        handle.check_now().await.unwrap();
        assert!(handle.update_available().await.unwrap());

        let mut input = (&b"c\nr\n"[..]).lines();
        let end = run_session(handle, &mut reload_rx, &mut input).await.unwrap();
        assert!(matches!(end, SessionEnd::Reload));
    }

    #[tokio::test]
    async fn command_typed_across_a_state_change_is_kept_whole() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app-version.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"version":"1.0.0","buildId":"abc123"}"#),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (host, mut reload_rx) =
            StorageHost::new(dir.path().join("caches"), dir.path().join("local.json")).unwrap();
        let provider = VersionProvider::mount(
            ProviderOptions {
                interval: Duration::from_secs(3_600),
                current: VersionRecord::new("1.0.0", "abc123"),
                ..Default::default()
            },
            Arc::new(HttpVersionFetcher::new(&server.uri(), "/app-version.json").unwrap()),
            Arc::new(host),
        );
        let handle = provider.handle();

        let (mut stdin, reader) = tokio::io::duplex(64);
        let mut input = tokio::io::BufReader::new(reader).lines();

        let session = run_session(handle.clone(), &mut reload_rx, &mut input);
        let typing = async {
            stdin.write_all(b"rel").await.unwrap();
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            // Publishes twice while "rel" sits unterminated in the reader.
            handle.check_now().await.unwrap();
            stdin.write_all(b"oad\n").await.unwrap();
        };

        let (end, ()) = tokio::join!(session, typing);
        assert!(matches!(end.unwrap(), SessionEnd::Reload));
    }

    #[tokio::test]
    async fn session_ends_on_eof() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (host, mut reload_rx) =
            StorageHost::new(dir.path().join("caches"), dir.path().join("local.json")).unwrap();
        let provider = VersionProvider::mount(
            ProviderOptions::default(),
            Arc::new(HttpVersionFetcher::new(&server.uri(), "/app-version.json").unwrap()),
            Arc::new(host),
        );

        let mut input = (&b""[..]).lines();
        let end = run_session(provider.handle(), &mut reload_rx, &mut input)
            .await
            .unwrap();
        assert!(matches!(end, SessionEnd::Quit));
    }
}
