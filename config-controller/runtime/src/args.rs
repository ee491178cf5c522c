use crate::{admission::Admission, core::Capabilities, sync::Registry};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry as Metrics;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[clap(
    name = "consul-config-controller",
    about = "Admits and syncs Consul config entry resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "consul=info,warn",
        env = "CONSUL_CONFIG_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the admission controller server.
    #[clap(long)]
    admission_controller_disabled: bool,

    /// The Consul datacenter resources are synced into.
    #[clap(long, default_value = "dc1", env = "CONSUL_DATACENTER")]
    datacenter: String,

    /// Consul Enterprise namespaces are enabled.
    #[clap(long, env = "CONSUL_ENABLE_NAMESPACES")]
    enable_namespaces: bool,

    /// The Consul namespace resources are written to when mirroring is off.
    #[clap(
        long,
        default_value = "default",
        env = "CONSUL_DESTINATION_NAMESPACE"
    )]
    consul_destination_namespace: String,

    /// Writes each resource to the Consul namespace matching its Kubernetes
    /// namespace.
    #[clap(long, env = "CONSUL_ENABLE_NAMESPACE_MIRRORING")]
    enable_namespace_mirroring: bool,

    #[clap(long, default_value = "", env = "CONSUL_MIRRORING_PREFIX")]
    mirroring_prefix: String,

    /// Consul Enterprise admin partitions are enabled.
    #[clap(long, env = "CONSUL_ENABLE_PARTITIONS")]
    enable_partitions: bool,

    #[clap(long, default_value = "default", env = "CONSUL_PARTITION")]
    partition: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let caps = self.capabilities();
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            admission_controller_disabled,
            datacenter,
            ..
        } = self;

        let server = if admission_controller_disabled {
            None
        } else {
            Some(server)
        };

        let mut prom = <Metrics>::default();
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(server)
            .build()
            .await?;

        let registry = Registry::new();
        info!(
            %datacenter,
            namespaces = caps.namespaces,
            mirroring = caps.mirroring,
            partitions = caps.partitions,
            kinds = registry.api_resources().count(),
            "Starting config controller",
        );

        let admission = Admission::new(
            Arc::new(registry),
            Arc::new(caps),
            Arc::new(runtime.client()),
        );
        let runtime = runtime.spawn_server(move || admission.clone());

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            namespaces: self.enable_namespaces,
            destination_namespace: self.consul_destination_namespace.clone(),
            mirroring: self.enable_namespace_mirroring,
            mirroring_prefix: self.mirroring_prefix.clone(),
            partitions: self.enable_partitions,
            partition: self.partition.clone(),
        }
    }
}
