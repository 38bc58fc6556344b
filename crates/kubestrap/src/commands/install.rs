use kubestrap_operations::pipelines::install_master;
use kubestrap_operations::{ClusterConfig, KubestrapConfig};

use super::{GlobalArgs, InstallMasterArgs, execute_pipeline, host_context};
use crate::error::Result;

pub(super) fn run(
    args: InstallMasterArgs,
    mut config: KubestrapConfig,
    globals: &GlobalArgs,
) -> Result<bool> {
    merge_flags(&mut config.cluster, args);

    let pipeline = install_master(&config.cluster);
    execute_pipeline(&pipeline, &config, globals, || {
        Ok(host_context(&config)?.with_cluster(config.cluster.clone()))
    })
}

/// Command-line flags take precedence over the config file.
fn merge_flags(cluster: &mut ClusterConfig, args: InstallMasterArgs) {
    if args.kubernetes_version.is_some() {
        cluster.kubernetes_version = args.kubernetes_version;
    }
    if args.pod_network_cidr.is_some() {
        cluster.pod_network_cidr = args.pod_network_cidr;
    }
    if args.service_cidr.is_some() {
        cluster.service_cidr = args.service_cidr;
    }
    if let Some(cni) = args.cni {
        cluster.cni = cni;
    }
    if args.control_plane_endpoint.is_some() {
        cluster.control_plane_endpoint = args.control_plane_endpoint;
    }
    if args.allow_schedule {
        cluster.allow_schedule_on_control_plane = true;
    }
}
