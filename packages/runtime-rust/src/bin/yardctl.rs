//! `yardctl`: inspect WSDL contracts, generate contracts for declared
//! services, and dry-run an application's lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use yardline_core::{
    write_contract_to_path, InterfaceCatalog, NativeInterface, QName, ServiceInterface,
    WsdlReader,
};
use yardline_runtime::activator::{Activator, ActivatorRegistry, PassThroughActivator};
use yardline_runtime::config::RuntimeConfig;
use yardline_runtime::deployment::LoggingListener;
use yardline_runtime::descriptor::{AppDescriptor, InterfaceDecl};
use yardline_runtime::domain::TransformerCatalog;
use yardline_runtime::logging::{self, LogFormat};
use yardline_runtime::ServiceRuntime;

#[derive(Debug, Parser)]
#[command(name = "yardctl", version, about = "Yardline service runtime tooling")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact, env = "YARDLINE_LOG_FORMAT")]
    log_format: LogFormat,

    /// Runtime configuration file (JSON).
    #[arg(long, global = true, env = "YARDLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the operation catalog of a WSDL document.
    Inspect {
        wsdl: String,
        #[arg(long)]
        port_type: Option<String>,
    },
    /// Write the WSDL contract of a service declared in a descriptor.
    Generate {
        #[arg(long)]
        descriptor: PathBuf,
        /// Service name, as `{namespace}local`.
        #[arg(long)]
        service: QName,
        /// Output file or directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Native interface definitions (JSON array).
        #[arg(long)]
        interfaces: Option<PathBuf>,
    },
    /// Start and stop an application with pass-through activators.
    Run {
        #[arg(long)]
        descriptor: PathBuf,
        /// Native interface definitions (JSON array).
        #[arg(long)]
        interfaces: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };

    match cli.command {
        Command::Inspect { wsdl, port_type } => inspect(&config, &wsdl, port_type.as_deref()),
        Command::Generate {
            descriptor,
            service,
            out,
            interfaces,
        } => generate(&config, &descriptor, &service, &out, interfaces.as_deref()),
        Command::Run {
            descriptor,
            interfaces,
        } => run(config, &descriptor, interfaces.as_deref()),
    }
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<InterfaceCatalog> {
    let mut catalog = InterfaceCatalog::new();
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading interfaces from {}", path.display()))?;
        let interfaces: Vec<NativeInterface> = serde_json::from_str(&text)
            .with_context(|| format!("parsing interfaces in {}", path.display()))?;
        for interface in interfaces {
            catalog.register(interface);
        }
    }
    Ok(catalog)
}

fn inspect(config: &RuntimeConfig, wsdl: &str, port_type: Option<&str>) -> anyhow::Result<()> {
    let reader = WsdlReader::with_resolver(config.resolver());
    let iface = reader.read_interface(wsdl, port_type)?;
    print_interface(&iface);
    Ok(())
}

fn print_interface(iface: &ServiceInterface) {
    for op in iface.operations() {
        match op.output_type() {
            Some(output) => println!("{}\t{:?}\t{} -> {}", op.name(), op.pattern(), op.input_type(), output),
            None => println!("{}\t{:?}\t{}", op.name(), op.pattern(), op.input_type()),
        }
    }
}

fn generate(
    config: &RuntimeConfig,
    descriptor: &Path,
    service: &QName,
    out: &Path,
    interfaces: Option<&Path>,
) -> anyhow::Result<()> {
    let app = AppDescriptor::from_file(descriptor)?;
    let decl = app
        .service(service)
        .with_context(|| format!("service {service} is not declared in {}", descriptor.display()))?;

    let iface = match &decl.interface {
        InterfaceDecl::Native { type_name } => {
            load_catalog(interfaces)?.resolve(type_name)?.to_interface()?
        }
        InterfaceDecl::Wsdl {
            location,
            port_type,
        } => WsdlReader::with_resolver(config.resolver())
            .read_interface(location, port_type.as_deref())?,
    };

    let path = write_contract_to_path(service, &iface, out)?;
    println!("{}", path.display());
    Ok(())
}

fn run(config: RuntimeConfig, descriptor: &Path, interfaces: Option<&Path>) -> anyhow::Result<()> {
    let app = AppDescriptor::from_file(descriptor)?;

    let mut activators = ActivatorRegistry::new();
    for binding_type in app.binding_types() {
        let name = binding_type.to_string();
        activators.register(binding_type, move || {
            Box::new(PassThroughActivator::new(name.clone())) as Box<dyn Activator>
        });
    }
    let mut transformers = TransformerCatalog::new();
    for decl in &app.transformers {
        transformers.register_declared(decl.transformer_type.as_str());
    }

    let mut runtime = ServiceRuntime::new(app, config, activators)
        .with_interface_catalog(load_catalog(interfaces)?)
        .with_transformer_catalog(transformers);
    runtime.add_listener(Arc::new(LoggingListener));

    runtime.start()?;
    for name in runtime.domain().service_names() {
        println!("{name}");
    }
    runtime.stop()?;
    Ok(())
}
