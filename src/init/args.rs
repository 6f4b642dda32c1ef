// SPDX-License-Identifier: Apache-2.0

use clap::Args;

use crate::init::file_receiver::FileReceiverArgs;

#[derive(Debug, Args, Clone)]
pub struct ReadRun {
    #[command(flatten)]
    pub file_receiver: FileReceiverArgs,

    /// Number of line events buffered between the reader and stdout
    #[arg(long, env = "GZTAIL_LINE_BUFFER_SIZE", default_value = "1024")]
    pub line_buffer_size: usize,
}
