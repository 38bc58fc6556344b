use kubestrap_operations::pipelines::join_node;
use kubestrap_operations::{JoinConfig, KubestrapConfig};

use super::{GlobalArgs, JoinArgs, execute_pipeline, host_context};
use crate::error::Result;

pub(super) fn run(args: JoinArgs, config: &KubestrapConfig, globals: &GlobalArgs) -> Result<bool> {
    let join = JoinConfig {
        api_server: args.api_server,
        token: args.token,
        discovery_token_ca_cert_hash: args.discovery_token_ca_cert_hash,
    };

    execute_pipeline(&join_node(), config, globals, || {
        Ok(host_context(config)?
            .with_cluster(config.cluster.clone())
            .with_join(join))
    })
}
