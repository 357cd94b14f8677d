//! Arrays, matrices and classes
//!
//! Arrays and matrices hold `i32` elements and are initialised from literal
//! lists; element access only takes literal indices. Class fields get their
//! offsets in declaration order and the layout is written to the header when
//! the class declaration closes.

use crate::emitter::Emitter;
use crate::error::SemanticError;
use crate::scope::Variable;
use crate::types::Type;
use crate::value::Value;
use rill_error::{Result, Span};
use rill_tree::{Node, NodeKind, Token, TokenKind};

#[derive(Debug, Clone)]
pub struct ArrayVar {
    pub slot: Value,
    pub elements: Vec<Value>,
}

impl ArrayVar {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// `[n x i32]`
    pub fn ir(&self) -> String {
        format!("[{} x i32]", self.len())
    }
}

#[derive(Debug, Clone)]
pub struct MatrixVar {
    pub slot: Value,
    pub rows: Vec<ArrayVar>,
}

impl MatrixVar {
    pub fn columns(&self) -> usize {
        self.rows.first().map(ArrayVar::len).unwrap_or(0)
    }

    /// `[r x [c x i32]*]`
    pub fn ir(&self) -> String {
        format!("[{} x [{} x i32]*]", self.rows.len(), self.columns())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub offset: usize,
}

/// Class layout, fields in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub fields: Vec<Field>,
    /// Mangled names of the class's methods
    pub methods: Vec<String>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Appends a field; its offset is the number of fields before it
    pub fn add_field(&mut self, name: impl Into<String>, ty: Type) -> Option<&Field> {
        let name = name.into();
        if self.field(&name).is_some() {
            return None;
        }
        let offset = self.fields.len();
        self.fields.push(Field { name, ty, offset });
        self.fields.last()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn mangle(&self, method: &str) -> String {
        format!("{}_{}", self.name, method)
    }

    /// `%Name = type { ... }`
    pub fn layout(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(|f| f.ty.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if fields.is_empty() {
            format!("%{} = type {{}}", self.name)
        } else {
            format!("%{} = type {{ {} }}", self.name, fields)
        }
    }
}

/// Int literal values of a list of tokens
fn literal_elements(kind: NodeKind, tokens: &[&Token]) -> Result<Vec<Value>> {
    tokens
        .iter()
        .map(|token| {
            if token.kind != TokenKind::Int {
                return Err(SemanticError::InvalidAggregate(format!(
                    "`{}` is not an int literal",
                    token.text
                ))
                .at(token.span));
            }
            let value: i32 = token.text.parse().map_err(|_| {
                SemanticError::malformed(kind, format!("`{}` is not an int literal", token.text))
                    .at(token.span)
            })?;
            Ok(Value::constant(value.to_string(), Type::Int))
        })
        .collect()
}

/// A literal index token
fn literal_index(token: Option<&Token>, span: Span) -> Result<String> {
    match token {
        Some(token) if token.kind == TokenKind::Int => token
            .text
            .parse::<i32>()
            .map(|i| i.to_string())
            .map_err(|_| SemanticError::InvalidAggregate(format!("bad index `{}`", token.text)).at(token.span)),
        Some(token) => Err(SemanticError::InvalidAggregate(format!(
            "index `{}` must be an int literal",
            token.text
        ))
        .at(token.span)),
        None => Err(SemanticError::InvalidAggregate("missing index".into()).at(span)),
    }
}

impl Emitter {
    fn declare_aggregate(&mut self, name: &str, variable: Variable, span: Span) -> Result<()> {
        if !self.scopes.declare_local(name, variable) {
            return Err(SemanticError::DuplicateVariable(name.to_string()).at(span));
        }
        Ok(())
    }

    /// One indexed store per element
    fn fill_array(&mut self, array: &ArrayVar) {
        let ty = array.ir();
        for (i, element) in array.elements.iter().enumerate() {
            let address = self.register(Type::Int);
            self.module.emit(format!(
                "{} = getelementptr inbounds {ty}, {ty}* {}, i32 0, i32 {}",
                address,
                array.slot,
                i,
                ty = ty
            ));
            self.module
                .emit(format!("store i32 {}, i32* {}", element, address));
        }
    }

    /// `name = [1, 2, 3]`
    pub(crate) fn exit_array_declaration(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let tokens: Vec<&Token> = node.tokens().skip(1).collect();
        let elements = literal_elements(node.kind, &tokens)?;
        if elements.is_empty() {
            return Err(SemanticError::InvalidAggregate(format!("array `{}` is empty", name)).at(node.span));
        }

        let array = ArrayVar {
            slot: Value::local(name, Type::Int),
            elements,
        };
        self.declare_aggregate(name, Variable::Array(array.clone()), node.span)?;
        self.module.emit(format!("{} = alloca {}", array.slot, array.ir()));
        self.fill_array(&array);
        Ok(())
    }

    /// `name = [[1, 2], [3, 4]]`: one slot per row plus a slot of row pointers
    pub(crate) fn exit_matrix_declaration(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let mut rows = Vec::new();
        for (i, row) in node.nodes().enumerate() {
            if row.kind != NodeKind::MatrixRow {
                return Err(SemanticError::malformed(node.kind, "expected matrix rows").at(row.span));
            }
            let tokens: Vec<&Token> = row.tokens().collect();
            rows.push(ArrayVar {
                slot: Value::local(format!("{}.row{}", name, i), Type::Int),
                elements: literal_elements(row.kind, &tokens)?,
            });
        }

        let columns = rows.first().map(ArrayVar::len).unwrap_or(0);
        if columns == 0 {
            return Err(SemanticError::InvalidAggregate(format!("matrix `{}` is empty", name)).at(node.span));
        }
        if rows.iter().any(|row| row.len() != columns) {
            return Err(SemanticError::InvalidAggregate(format!(
                "rows of matrix `{}` differ in length",
                name
            ))
            .at(node.span));
        }

        let matrix = MatrixVar {
            slot: Value::local(name, Type::Int),
            rows,
        };
        self.declare_aggregate(name, Variable::Matrix(matrix.clone()), node.span)?;

        self.module.emit(format!("{} = alloca {}", matrix.slot, matrix.ir()));
        for row in &matrix.rows {
            self.module.emit(format!("{} = alloca {}", row.slot, row.ir()));
        }
        for row in &matrix.rows {
            self.fill_array(row);
        }

        let ty = matrix.ir();
        let row_ty = format!("[{} x i32]", columns);
        for (i, row) in matrix.rows.iter().enumerate() {
            let address = self.register(Type::Int);
            self.module.emit(format!(
                "{} = getelementptr inbounds {ty}, {ty}* {}, i32 0, i32 {}",
                address,
                matrix.slot,
                i,
                ty = ty
            ));
            self.module.emit(format!(
                "store {row}* {}, {row}** {}",
                row.slot,
                address,
                row = row_ty
            ));
        }
        Ok(())
    }

    /// `name[i]`
    pub(crate) fn exit_array_index(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let index = literal_index(node.token(1), node.span)?;
        let Variable::Array(array) = self.lookup(name, node.span)? else {
            return Err(SemanticError::InvalidAggregate(format!("`{}` is not an array", name)).at(node.span));
        };

        let ty = array.ir();
        let address = self.register(Type::Int);
        self.module.emit(format!(
            "{} = getelementptr inbounds {ty}, {ty}* {}, i32 0, i32 {}",
            address,
            array.slot,
            index,
            ty = ty
        ));
        let value = self.register(Type::Int);
        self.module
            .emit(format!("{} = load i32, i32* {}", value, address));
        self.stack.push(value);
        Ok(())
    }

    /// `name[r][c]`: load the row pointer, then the element
    pub(crate) fn exit_matrix_index(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let row = literal_index(node.token(1), node.span)?;
        let column = literal_index(node.token(2), node.span)?;
        let Variable::Matrix(matrix) = self.lookup(name, node.span)? else {
            return Err(SemanticError::InvalidAggregate(format!("`{}` is not a matrix", name)).at(node.span));
        };

        let ty = matrix.ir();
        let row_ty = format!("[{} x i32]", matrix.columns());

        let row_address = self.register(Type::Int);
        self.module.emit(format!(
            "{} = getelementptr inbounds {ty}, {ty}* {}, i32 0, i32 {}",
            row_address,
            matrix.slot,
            row,
            ty = ty
        ));
        let row_ptr = self.register(Type::Int);
        self.module.emit(format!(
            "{} = load {row}*, {row}** {}",
            row_ptr,
            row_address,
            row = row_ty
        ));
        let address = self.register(Type::Int);
        self.module.emit(format!(
            "{} = getelementptr inbounds {row}, {row}* {}, i32 0, i32 {}",
            address,
            row_ptr,
            column,
            row = row_ty
        ));
        let value = self.register(Type::Int);
        self.module
            .emit(format!("{} = load i32, i32* {}", value, address));
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn enter_class(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        if self.function.is_some() || self.class.is_some() || self.block_open() {
            return Err(SemanticError::InvalidPlacement(format!(
                "class `{}` must be declared at top level",
                name
            ))
            .at(node.span));
        }
        if self.classes.contains_key(name) {
            return Err(SemanticError::DuplicateClass(name.to_string()).at(node.span));
        }
        self.class = Some(ClassDef::new(name));
        Ok(())
    }

    pub(crate) fn exit_member_declaration(&mut self, node: &Node) -> Result<()> {
        let type_name = self.token_text(node, 0, TokenKind::TypeName)?;
        let name = self.ident(node, 1)?;
        let ty = match Type::from_name(type_name) {
            Some(ty) if ty.is_scalar() => ty,
            Some(_) => return Err(SemanticError::InvalidType(type_name.to_string()).at(node.span)),
            None if self.resolve_type(type_name).is_some() => {
                return Err(SemanticError::InvalidType(type_name.to_string()).at(node.span))
            }
            None => return Err(SemanticError::UnknownType(type_name.to_string()).at(node.span)),
        };

        let Some(class) = self.class.as_mut() else {
            return Err(SemanticError::InvalidPlacement(format!(
                "field `{}` outside a class",
                name
            ))
            .at(node.span));
        };
        if class.add_field(name, ty).is_none() {
            return Err(SemanticError::DuplicateField {
                class: class.name.clone(),
                field: name.to_string(),
            }
            .at(node.span));
        }
        Ok(())
    }

    /// Writes the layout and makes the class instantiable
    pub(crate) fn exit_class(&mut self, node: &Node) -> Result<()> {
        let class = self.class.take().ok_or_else(|| {
            SemanticError::EngineInvariant("class closed twice".into()).at(node.span)
        })?;
        self.module.emit_global(class.layout());
        tracing::debug!(
            "class `{}` laid out with {} field(s), {} method(s)",
            class.name,
            class.fields.len(),
            class.methods.len()
        );
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    /// `Class var = new Class()`
    pub(crate) fn exit_instantiation(&mut self, node: &Node) -> Result<()> {
        let class_name = self.ident(node, 0)?;
        let name = self.ident(node, 1)?;
        if !self.classes.contains_key(class_name) {
            return Err(SemanticError::UnknownClass(class_name.to_string()).at(node.span));
        }

        let slot = Value::local(name, Type::Complex(class_name.to_string()));
        let object = Variable::Object {
            slot: slot.clone(),
            class: class_name.to_string(),
        };
        self.declare_aggregate(name, object, node.span)?;
        self.module.emit(format!("{} = alloca %{}", slot, class_name));
        Ok(())
    }

    /// Class of an object variable, open or closed
    pub(crate) fn class_def(&self, name: &str) -> Option<&ClassDef> {
        self.classes
            .get(name)
            .or_else(|| self.class.as_ref().filter(|c| c.name == name))
    }

    /// Address of `object.field`
    fn field_address(&mut self, node: &Node) -> Result<(Value, Type)> {
        let object = self.ident(node, 0)?;
        let field_name = self.ident(node, 1)?;
        let Variable::Object { slot, class } = self.lookup(object, node.span)? else {
            return Err(SemanticError::NotAScalar {
                name: object.to_string(),
                what: "not a class instance",
            }
            .at(node.span));
        };

        let field = self
            .class_def(&class)
            .ok_or_else(|| SemanticError::UnknownClass(class.clone()).at(node.span))?
            .field(field_name)
            .cloned()
            .ok_or_else(|| {
                SemanticError::UnknownMember {
                    class: class.clone(),
                    field: field_name.to_string(),
                }
                .at(node.span)
            })?;

        let address = self.register(field.ty.clone());
        self.module.emit(format!(
            "{} = getelementptr inbounds %{c}, %{c}* {}, i32 0, i32 {}",
            address,
            slot,
            field.offset,
            c = class
        ));
        Ok((address, field.ty))
    }

    /// `object.field` as a value
    pub(crate) fn exit_member_access(&mut self, node: &Node) -> Result<()> {
        let (address, ty) = self.field_address(node)?;
        let value = self.register(ty.clone());
        self.module
            .emit(format!("{} = load {}, {}* {}", value, ty, ty, address));
        self.stack.push(value);
        Ok(())
    }

    /// `object.field = expr`
    pub(crate) fn exit_member_assignment(&mut self, node: &Node) -> Result<()> {
        let value = self.pop_value(node.span)?;
        let (address, ty) = self.field_address(node)?;
        if value.ty != ty {
            return Err(SemanticError::TypeMismatch {
                expected: ty,
                found: value.ty,
            }
            .at(node.span));
        }
        self.store(&value, &address);
        Ok(())
    }
}
