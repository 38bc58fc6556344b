use kubestrap_operations::KubestrapConfig;
use kubestrap_operations::pipelines::reset;

use super::{GlobalArgs, execute_pipeline, host_context};
use crate::error::Result;

pub(super) fn run(config: &KubestrapConfig, globals: &GlobalArgs) -> Result<bool> {
    execute_pipeline(&reset(), config, globals, || host_context(config))
}
