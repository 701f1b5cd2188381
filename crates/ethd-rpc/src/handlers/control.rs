// crates/ethd-rpc/src/handlers/control.rs
//
// Control handlers: help, uptime.

use futures::future::BoxFuture;
use serde_json::Value;

use ethd_core::error::EthdError;

use super::{to_json, Params};
use crate::proxy::EthereumProxy;
use crate::registry::{self, Category, MethodSpec};

impl EthereumProxy {
    /// Listing of all commands, or the help text of one.
    pub fn help(&self, command: Option<&str>) -> String {
        registry::help(command)
    }

    /// Seconds since the proxy started.
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime().as_secs()
    }
}

fn handle_help(proxy: &EthereumProxy, params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move {
        let command = params.opt_string(0, "command")?;
        to_json(proxy.help(command.as_deref()))
    })
}

fn handle_uptime(proxy: &EthereumProxy, _params: Params) -> BoxFuture<'_, Result<Value, EthdError>> {
    Box::pin(async move { to_json(proxy.uptime_seconds()) })
}

pub(crate) static METHODS: &[MethodSpec] = &[
    MethodSpec {
        name: "help",
        category: Category::Control,
        summary: "help ( \"command\" )",
        doc: "help ( \"command\" )\n\
              \n\
              List all commands, or get help for a specified command.\n\
              \n\
              Arguments:\n\
              1. \"command\"     (string, optional) The command to get help on\n\
              \n\
              Result:\n\
              \"text\"     (string) The help text",
        min_params: 0,
        max_params: 1,
        handler: handle_help,
    },
    MethodSpec {
        name: "uptime",
        category: Category::Control,
        summary: "uptime",
        doc: "uptime\n\
              \n\
              Returns the total uptime of the server.\n\
              \n\
              Result:\n\
              ttt        (numeric) The number of seconds that the server has been running\n\
              \n\
              Examples:\n\
              > ethereum-cli uptime",
        min_params: 0,
        max_params: 0,
        handler: handle_uptime,
    },
];
