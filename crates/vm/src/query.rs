use std::collections::VecDeque;

use smol_str::SmolStr;

use crate::error::{Result, RuntimeError};
use crate::list::{GenericList, ListRef};
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::value::Value;

/// A cell of a result row as the database driver reports it.
#[derive(Clone, Debug, PartialEq)]
pub enum DbCell {
    Null,
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// A bound `?` parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum DbParam {
    Float(f32),
    Text(SmolStr),
}

/// Map a result cell to a script value. Numbers become floats, text becomes a string; other
/// storage types have no script representation.
pub fn cell_to_value(cell: &DbCell) -> Result<Value> {
    match cell {
        DbCell::Integer(i) => Ok(Value::Float(*i as f32)),
        DbCell::Long(l) => Ok(Value::Float(*l as f32)),
        DbCell::Float(f) => Ok(Value::Float(*f)),
        DbCell::Double(d) => Ok(Value::Float(*d as f32)),
        DbCell::Text(s) => Ok(Value::string(s)),
        DbCell::Null => Err(RuntimeError::UnsupportedType("null")),
        DbCell::Blob(_) => Err(RuntimeError::UnsupportedType("blob")),
    }
}

/// Rewrite `?` placeholders outside quotes into numbered `@N` parameters.
pub fn parse_command_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut next_param = 0;
    for c in text.chars() {
        match c {
            '\'' | '"' => in_quotes = !in_quotes,
            '?' if !in_quotes => {
                out.push('@');
                out.push_str(&next_param.to_string());
                next_param += 1;
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// State of a `/database/query` object: the pending command and the rows it produced.
#[derive(Debug, Default)]
pub struct QueryCursor {
    command: Option<String>,
    /// Bound parameters by placeholder number.
    params: Vec<(usize, DbParam)>,
    columns: Vec<SmolStr>,
    rows: VecDeque<Vec<DbCell>>,
    current: Option<Vec<DbCell>>,
    rows_affected: usize,
    error: Option<(i32, String)>,
}

impl QueryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare `text` with `args` bound to its placeholders in order. Only numbers and strings
    /// bind; a placeholder whose argument is anything else stays unbound.
    pub fn setup_command(&mut self, text: &str, args: &[Value]) {
        self.command = Some(parse_command_text(text));
        self.params = args
            .iter()
            .enumerate()
            .filter_map(|(i, arg)| match arg {
                Value::Float(f) => Some((i, DbParam::Float(*f))),
                Value::String(s) => Some((i, DbParam::Text(s.clone()))),
                _ => None,
            })
            .collect();
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn params(&self) -> &[(usize, DbParam)] {
        &self.params
    }

    /// Take the pending command for execution.
    pub fn take_command(&mut self) -> Option<(String, Vec<(usize, DbParam)>)> {
        let command = self.command.take()?;
        Some((command, std::mem::take(&mut self.params)))
    }

    /// Install the result of executing the command.
    pub fn load_results(&mut self, columns: Vec<SmolStr>, rows: Vec<Vec<DbCell>>, rows_affected: usize) {
        self.columns = columns;
        self.rows = rows.into();
        self.current = None;
        self.rows_affected = rows_affected;
        self.error = None;
    }

    /// Advance to the next row. `false` once the rows run out.
    pub fn next_row(&mut self) -> bool {
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    pub fn columns(&self) -> &[SmolStr] {
        &self.columns
    }

    pub fn column_name(&self, index: usize) -> Option<&SmolStr> {
        self.columns.get(index)
    }

    pub fn cell(&self, index: usize) -> Option<&DbCell> {
        self.current.as_ref()?.get(index)
    }

    pub fn current_row(&self) -> Option<impl Iterator<Item = (&SmolStr, &DbCell)>> {
        Some(self.columns.iter().zip(self.current.as_ref()?))
    }

    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    pub fn set_error(&mut self, code: i32, message: impl Into<String>) {
        self.error = Some((code, message.into()));
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|(code, _)| *code)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(_, message)| message.as_str())
    }
}

impl Runtime {
    /// `new /database/query(text, args...)`.
    pub fn new_query(&mut self, text: Option<&str>, args: &[Value]) -> Result<ObjectId> {
        let mut cursor = QueryCursor::new();
        if let Some(text) = text {
            cursor.setup_command(text, args);
        }
        let def = self.tree.get("/database/query")?;
        let object = DreamObject::new(def, ObjectKind::Query(cursor.into()));
        Ok(self.insert_object(object.into()))
    }

    /// Run `f` on a query object's cursor.
    pub fn with_query<R>(&self, query: ObjectId, f: impl FnOnce(&mut QueryCursor) -> R) -> Result<R> {
        let object = self.object(query)?;
        match &object.kind {
            ObjectKind::Query(cursor) => {
                let mut cursor = cursor
                    .try_borrow_mut()
                    .map_err(|_| RuntimeError::not_supported("re-entrant access", "database query"))?;
                Ok(f(&mut cursor))
            }
            _ => Err(RuntimeError::TypeCast {
                value: object.def.path.to_string(),
                expected: "database query",
            }),
        }
    }

    /// The current row as an associative list of column name to value. `None` before the
    /// first row and after the last.
    pub fn query_row_list(&mut self, query: ObjectId) -> Result<Option<ListRef>> {
        let row = self.with_query(query, |cursor| {
            cursor.current_row().map(|row| {
                row.map(|(name, cell)| -> Result<(Value, Value)> {
                    Ok((Value::String(name.clone()), cell_to_value(cell)?))
                })
                .collect::<Result<Vec<_>>>()
            })
        })?;
        let row = match row {
            Some(row) => row?,
            None => return Ok(None),
        };
        let mut list = GenericList::new();
        for (name, value) in row {
            list.set_assoc(name, value);
        }
        Ok(Some(self.new_list_with(list)))
    }

    /// One cell of the current row. Missing cells are `Null`.
    pub fn query_column(&self, query: ObjectId, index: usize) -> Result<Value> {
        self.with_query(query, |cursor| cursor.cell(index).map(cell_to_value))?
            .unwrap_or(Ok(Value::Null))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_placeholders_outside_quotes() {
        assert_eq!(
            parse_command_text("SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?"),
            "SELECT * FROM t WHERE a = @0 AND b = '?' AND c = @1"
        );
    }

    #[test]
    fn test_cell_mapping() {
        assert_eq!(cell_to_value(&DbCell::Long(7)).unwrap(), Value::Float(7.0));
        assert_eq!(cell_to_value(&DbCell::Double(0.5)).unwrap(), Value::Float(0.5));
        assert_eq!(
            cell_to_value(&DbCell::Text("x".into())).unwrap(),
            Value::string("x")
        );
        assert!(matches!(
            cell_to_value(&DbCell::Blob(vec![1])),
            Err(RuntimeError::UnsupportedType("blob"))
        ));
        assert!(matches!(
            cell_to_value(&DbCell::Null),
            Err(RuntimeError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_setup_binds_numbers_and_strings_only() {
        let mut cursor = QueryCursor::new();
        cursor.setup_command("INSERT INTO t VALUES (?, ?, ?)", &[
            Value::Float(1.0),
            Value::Null,
            Value::string("a"),
        ]);
        assert_eq!(cursor.command(), Some("INSERT INTO t VALUES (@0, @1, @2)"));
        assert_eq!(
            cursor.params(),
            &[(0, DbParam::Float(1.0)), (2, DbParam::Text("a".into()))]
        );
    }
}
