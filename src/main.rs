use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Result, WrapErr};
use serde_json::json;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use zbus::Connection;

use wifictl::auth;
use wifictl::config::{self, Config, Overrides};
use wifictl::control::{ModeController, OnConnect, SharedController, Status};
use wifictl::monitor::{Args, Callback, Daemon, DbusSignalSource, Normalizer, ShutdownHandle};
use wifictl::network::{
    AccessPoint, ClientLink, HostAp, Interface, NetworkParams, Supplicant, WirelessInterface,
};

/// wifictl: switch a wireless interface between client and hotspot mode
#[derive(Parser, Debug)]
#[command(name = "wifictl", version, about, long_about = None)]
struct Cli {
    /// Path to a config file [default: /etc/wifictl/config.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Wireless interface (overrides config file)
    #[arg(short, long, global = true)]
    interface: Option<String>,

    /// Log file path (logs go to stderr if not specified)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Log level filter (overrides config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current mode and its status as JSON
    Status,
    /// Unblock the radio and start the client if WiFi is off
    On,
    /// Stop both services and block the radio
    Off,
    /// Switch to client mode
    Client,
    /// Switch to hotspot mode
    Hotspot,
    /// Join a configured network, falling back to hotspot mode on failure
    Connect {
        ssid: String,
        /// Seconds to wait for the connection (overrides config file)
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Disconnect the client link
    Disconnect,
    /// Trigger a scan and print the results as JSON
    Scan {
        /// Seconds to wait for scan results
        #[arg(short, long, default_value_t = 3)]
        wait: u64,
    },
    /// Manage configured client networks
    Networks {
        #[command(subcommand)]
        action: Option<NetworksAction>,
    },
    /// Device names (host, hotspot SSID, peer discovery)
    Names {
        #[command(subcommand)]
        action: NamesAction,
    },
    /// Set the hotspot passphrase
    Password { password: String },
    /// Print the interface's IPv4 address
    Ip,
    /// Monitor service events until SIGINT/SIGTERM
    Daemon,
    /// Print the built-in default config
    DefaultConfig,
}

#[derive(Subcommand, Debug)]
enum NetworksAction {
    /// List configured networks as JSON
    List,
    /// Add a network
    Add {
        ssid: String,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(long)]
        hidden: bool,
    },
    /// Remove a network
    Remove { ssid: String },
}

#[derive(Subcommand, Debug)]
enum NamesAction {
    /// Write and verify all device names
    Set { name: String },
    /// Check that all device names match
    Verify { name: String },
}

/// Service facades built once from the config
struct Services {
    connection: Connection,
    client: Arc<dyn ClientLink>,
    hotspot: Arc<dyn AccessPoint>,
    interface: Arc<dyn Interface>,
}

impl Services {
    fn new(connection: Connection, config: &Config) -> Self {
        let iface = config.general.interface.clone();
        let client = Supplicant::new(
            connection.clone(),
            iface.clone(),
            config.units.client.clone(),
            config.paths.p2p_supplicant_config.clone(),
        );
        let hotspot = HostAp::new(
            connection.clone(),
            iface.clone(),
            config.units.hotspot.clone(),
            config.paths.hostapd_config.clone(),
            config.paths.hostname.clone(),
        );
        let interface = WirelessInterface::new(connection.clone(), iface, &config.units.dns);
        Self {
            connection,
            client: Arc::new(client),
            hotspot: Arc::new(hotspot),
            interface: Arc::new(interface),
        }
    }

    fn controller(&self) -> SharedController {
        ModeController::new(
            self.client.clone(),
            self.hotspot.clone(),
            self.interface.clone(),
        )
        .into_shared()
    }

    fn daemon(&self, config: &Config, controller: SharedController) -> Daemon<DbusSignalSource> {
        let vocabulary = config.monitor.vocabulary;
        let source = DbusSignalSource::new(
            self.connection.clone(),
            self.client.clone(),
            config.units.hotspot.clone(),
            vocabulary,
        );
        let normalizer = Normalizer::new(vocabulary, self.client.clone(), self.hotspot.clone());
        Daemon::new(source, normalizer, controller)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if matches!(cli.command, Command::DefaultConfig) {
        print!("{}", config::default_config_toml());
        return Ok(());
    }

    let overrides = Overrides {
        interface: cli.interface.clone(),
        log_level: cli.log_level.clone(),
    };
    let config = config::load(cli.config.as_deref(), &overrides)?;
    let _guard = init_logging(cli.log.as_deref(), &config.general.log_level)?;

    info!(interface = %config.general.interface, "wifictl starting");
    auth::check_permissions();

    let connection = Connection::system()
        .await
        .wrap_err("Failed to connect to the system bus")?;
    let services = Services::new(connection, &config);
    let controller = services.controller();

    match cli.command {
        Command::Status => {
            let ctl = controller.lock().await;
            let (mode, status) = ctl.status().await;
            print_json(&json!({
                "mode": mode,
                "service": mode.to_string(),
                "wifi_on": ctl.wifi_turned_on().await,
                "status": status,
                "timestamp": chrono::Local::now(),
            }))?;
        }
        Command::On => ensure(controller.lock().await.turn_on().await, "turn WiFi on")?,
        Command::Off => ensure(controller.lock().await.turn_off().await, "turn WiFi off")?,
        Command::Client => ensure(
            controller.lock().await.enter_client_mode().await,
            "enter client mode",
        )?,
        Command::Hotspot => ensure(
            controller.lock().await.enter_hotspot_mode().await,
            "enter hotspot mode",
        )?,
        Command::Connect { ssid, timeout } => {
            let timeout = timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.connect_timeout());
            connect(&services, &config, controller, &ssid, timeout).await?;
        }
        Command::Disconnect => controller.lock().await.disconnect().await?,
        Command::Scan { wait } => {
            let ctl = controller.lock().await;
            ctl.scan().await?;
            tokio::time::sleep(Duration::from_secs(wait)).await;
            print_json(&ctl.scan_results().await?)?;
        }
        Command::Networks { action } => {
            let ctl = controller.lock().await;
            match action.unwrap_or(NetworksAction::List) {
                NetworksAction::List => print_json(&ctl.added_networks().await?)?,
                NetworksAction::Add {
                    ssid,
                    password,
                    hidden,
                } => {
                    ctl.add_network(&NetworkParams {
                        ssid,
                        password,
                        hidden,
                    })
                    .await?
                }
                NetworksAction::Remove { ssid } => ctl.remove_network(&ssid).await?,
            }
        }
        Command::Names { action } => {
            let ctl = controller.lock().await;
            match action {
                NamesAction::Set { name } => ensure(ctl.set_names(&name).await, "set names")?,
                NamesAction::Verify { name } => {
                    let ok = ctl.verify_names(&name).await;
                    println!("{}", ok);
                    ensure(ok, "verify names")?;
                }
            }
        }
        Command::Password { password } => {
            controller
                .lock()
                .await
                .set_hotspot_password(&password)
                .await?
        }
        Command::Ip => match controller.lock().await.ip().await? {
            Some(ip) => println!("{}", ip),
            None => bail!("{} has no IPv4 address", config.general.interface),
        },
        Command::Daemon => daemon(&services, &config, controller).await?,
        Command::DefaultConfig => {}
    }

    Ok(())
}

/// Arm the attempt with the subscriptions already in place, then run the
/// event loop until it resolves.
async fn connect(
    services: &Services,
    config: &Config,
    controller: SharedController,
    ssid: &str,
    timeout: Duration,
) -> Result<()> {
    let mut daemon = services.daemon(config, controller.clone());
    daemon
        .begin_connect(ssid, OnConnect::Fallback, timeout)
        .await
        .wrap_err_with(|| format!("Could not watch the connection to '{}'", ssid))?;

    let mut deadlines = controller.lock().await.deadline_receiver();
    if deadlines.borrow().is_some() {
        let shutdown = daemon.shutdown_handle();
        tokio::spawn(async move {
            tokio::select! {
                _ = deadlines.wait_for(Option::is_none) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            shutdown.stop();
        });
        daemon.run().await?;
    }

    let (mode, status) = controller.lock().await.status().await;
    print_json(&json!({ "mode": mode, "status": status }))?;
    match status {
        Some(Status::Client(s)) if s.is_connected() => Ok(()),
        _ => bail!("Could not connect to '{}'", ssid),
    }
}

async fn daemon(services: &Services, config: &Config, controller: SharedController) -> Result<()> {
    let mut daemon = services.daemon(config, controller);

    let log_event = Callback::new("log_event", |event, payload, _args| async move {
        let payload = serde_json::to_string(&payload)?;
        info!(%event, %payload, "Event");
        Ok(())
    });
    for event in config.monitor.vocabulary.events() {
        daemon.register(event, log_event.clone(), Args::default());
    }

    spawn_signal_handler(daemon.shutdown_handle())?;
    daemon.run().await?;
    info!("wifictl daemon exiting");
    Ok(())
}

fn spawn_signal_handler(shutdown: ShutdownHandle) -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).wrap_err("Failed to install SIGTERM handler")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
        shutdown.stop();
    });
    Ok(())
}

fn ensure(ok: bool, what: &str) -> Result<()> {
    if !ok {
        bail!("Failed to {}", what);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing to stderr, or to a file through a non-blocking writer.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging(log_path: Option<&Path>, level: &str) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = log_path else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let Some(file_name) = path.file_name() else {
        bail!("Invalid log file path: {}", path.display());
    };
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
