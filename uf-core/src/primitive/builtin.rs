//! Built-in user action types
//!
//! `CONST` answers GET with its first parameter. `CONFIG` keeps values in an
//! in-memory store keyed by its first parameter, so a SET is visible to
//! later GETs.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::action::ActionHandler;
use crate::data::DataBuffer;
use crate::dsp::{ActionParam, ActionParams};
use crate::error::{Result, UfError};

fn first_param(params: &ActionParams) -> Result<&ActionParam> {
    params[0]
        .as_ref()
        .ok_or_else(|| UfError::ParameterIsNull("action parameter 1".into()))
}

/// Constant value action
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstAction;

impl ActionHandler for ConstAction {
    fn get(&self, _device_path: &str, params: &ActionParams, _request: &DataBuffer, response: &mut DataBuffer) -> Result<()> {
        match first_param(params)? {
            ActionParam::U32(v) => response.set_u32(*v),
            ActionParam::Str(s) => response.write_str(s),
        }
    }

    fn set(&self, _device_path: &str, _params: &ActionParams, _request: &DataBuffer) -> Result<()> {
        Err(UfError::NotSupported("CONST is read-only".into()))
    }
}

/// Key/value configuration action
#[derive(Debug, Default)]
pub struct ConfigAction {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl ConfigAction {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(params: &ActionParams) -> Result<String> {
        match first_param(params)? {
            ActionParam::Str(s) => Ok(s.clone()),
            ActionParam::U32(v) => Ok(v.to_string()),
        }
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.values.read().get(key).cloned()
    }
}

impl ActionHandler for ConfigAction {
    fn get(&self, _device_path: &str, params: &ActionParams, _request: &DataBuffer, response: &mut DataBuffer) -> Result<()> {
        let key = Self::key(params)?;
        let values = self.values.read();
        let bytes = values
            .get(&key)
            .ok_or_else(|| UfError::NotSupported(format!("config key {} not set", key)))?;
        response.write(bytes)
    }

    fn set(&self, _device_path: &str, params: &ActionParams, request: &DataBuffer) -> Result<()> {
        let key = Self::key(params)?;
        self.values.write().insert(key, request.data().to_vec());
        Ok(())
    }
}
