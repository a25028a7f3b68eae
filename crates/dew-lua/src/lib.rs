//! Lua 5.4 binding for dew operation tables.
//!
//! Scalars cross the boundary as native Lua values. Vectors, quaternions and
//! matrices cross as [`Tagged`] userdata, which prints, compares and indexes
//! the way glm values do.
//!
//! # Example
//!
//! ```
//! use mlua::Lua;
//!
//! let lua = Lua::new();
//! rhizome_dew_lua::install_glm(&lua).unwrap();
//! let d: f64 = lua
//!     .load("glm.dot(glm.vec3(1, 2, 3), glm.vec3(4, 5, 6))")
//!     .eval()
//!     .unwrap();
//! assert_eq!(d, 32.0);
//! ```

use std::sync::Arc;

use mlua::{Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, Value as LuaValue};
use rhizome_dew_dispatch::{ArgStack, DispatchError, Operation, OperationTable, Value};

/// Errors raised while moving values between Lua and the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum LuaBindError {
    #[error("bad argument #{position} (cannot pass a {lua_type} to a glm function)")]
    Unsupported {
        lua_type: &'static str,
        position: usize,
    },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

// ============================================================================
// Userdata
// ============================================================================

/// A composite value living in Lua.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged(pub Value);

const COMPONENT_NAMES: [&str; 4] = ["x", "y", "z", "w"];

impl Tagged {
    /// Component by name (`x`..`w`) or by 1-based position in
    /// [`Value::unpack`] order. Quaternions index as `w, x, y, z`; matrices
    /// index by column.
    fn component(&self, key: &LuaValue) -> Option<Value> {
        let index = match key {
            LuaValue::Integer(i) => usize::try_from(*i).ok()?.checked_sub(1)?,
            LuaValue::Number(n) if n.fract() == 0.0 && *n >= 1.0 => *n as usize - 1,
            LuaValue::String(s) => {
                let name: String = s.to_string_lossy().into();
                let slot = COMPONENT_NAMES.iter().position(|c| *c == name)?;
                return match &self.0 {
                    Value::Quat(q) => q.0.get(slot).map(|x| Value::Float(*x)),
                    Value::Vec2(_) | Value::Vec3(_) | Value::Vec4(_) => {
                        self.0.unpack().get(slot).cloned()
                    }
                    _ => None,
                };
            }
            _ => return None,
        };
        self.0.unpack().get(index).cloned()
    }
}

impl UserData for Tagged {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.to_string()));
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: LuaValue| {
            Ok(match other {
                LuaValue::UserData(ud) => ud.borrow::<Tagged>().is_ok_and(|o| o.0 == this.0),
                _ => false,
            })
        });
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: LuaValue| {
            match this.component(&key) {
                Some(value) => to_lua(lua, value),
                None => Ok(LuaValue::Nil),
            }
        });
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.0.unpack().len()));
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Reads a Lua value as a dispatch argument. `position` is 1-based and only
/// used for the error.
pub fn from_lua(value: &LuaValue, position: usize) -> Result<Value, LuaBindError> {
    let unsupported = || LuaBindError::Unsupported {
        lua_type: value.type_name(),
        position,
    };
    Ok(match value {
        LuaValue::Nil => Value::Nil,
        LuaValue::Boolean(b) => Value::Bool(*b),
        LuaValue::Integer(i) => Value::Int(*i),
        LuaValue::Number(n) => Value::Float(*n),
        LuaValue::String(s) => {
            let s: String = s.to_string_lossy().into();
            Value::Str(Arc::from(s))
        }
        LuaValue::UserData(ud) => match ud.borrow::<Tagged>() {
            Ok(tagged) => tagged.0.clone(),
            Err(_) => return Err(unsupported()),
        },
        _ => return Err(unsupported()),
    })
}

pub fn to_lua(lua: &Lua, value: Value) -> mlua::Result<LuaValue> {
    Ok(match value {
        Value::Nil => LuaValue::Nil,
        Value::Bool(b) => LuaValue::Boolean(b),
        Value::Int(i) => LuaValue::Integer(i),
        Value::Float(x) => LuaValue::Number(x),
        Value::Str(s) => LuaValue::String(lua.create_string(s.as_bytes())?),
        composite => LuaValue::UserData(lua.create_userdata(Tagged(composite))?),
    })
}

fn invoke(lua: &Lua, op: &Operation, args: MultiValue) -> mlua::Result<MultiValue> {
    let values = args
        .iter()
        .enumerate()
        .map(|(i, v)| from_lua(v, i + 1))
        .collect::<Result<Vec<_>, _>>()
        .map_err(mlua::Error::external)?;
    let mut stack = ArgStack::new(values);
    op.call(&mut stack)
        .map_err(|e| mlua::Error::external(LuaBindError::from(e)))?;
    stack
        .into_results()
        .into_iter()
        .map(|v| to_lua(lua, v))
        .collect()
}

// ============================================================================
// Installation
// ============================================================================

#[derive(Debug, Clone)]
pub struct LuaConfig {
    /// Global name the namespace table is stored under.
    pub namespace: String,
    /// When false the table is only returned, not stored in the globals.
    pub set_global: bool,
}

impl Default for LuaConfig {
    fn default() -> Self {
        Self {
            namespace: "glm".to_string(),
            set_global: true,
        }
    }
}

/// Builds a table with one function per operation name (aliases included).
pub fn install(lua: &Lua, table: &OperationTable, config: &LuaConfig) -> mlua::Result<Table> {
    let namespace = lua.create_table()?;
    for name in table.names() {
        let Some(op) = table.get(name).cloned() else {
            continue;
        };
        let function = lua.create_function(move |lua, args: MultiValue| invoke(lua, &op, args))?;
        namespace.set(name, function)?;
    }
    if config.set_global {
        lua.globals().set(config.namespace.as_str(), namespace.clone())?;
    }
    tracing::debug!(
        operations = table.len(),
        namespace = %config.namespace,
        global = config.set_global,
        "installed operations into lua"
    );
    Ok(namespace)
}

/// Installs the default glm table as the global `glm`.
pub fn install_glm(lua: &Lua) -> mlua::Result<Table> {
    install(lua, &rhizome_dew_glm::glm_registry(), &LuaConfig::default())
}
