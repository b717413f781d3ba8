// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions consumed by the compiler.
//!
//! These structures follow ESTree where possible. Nodes that introduce a
//! lexical frame carry a [`Scope`] listing the names declared there, and the
//! [`Program`] root lists its free names in [`Program::globals`]. A producer
//! that does not compute scopes itself can call [`Program::analyze`].

pub mod build;
mod scope;

/// Names declared by a scope-introducing node.
///
/// Register slots are assigned in the order `variables` then `functions`,
/// skipping duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    /// Declared variable names (`var`, `let`, `const`)
    pub variables: Vec<String>,
    /// Declared nested function names
    pub functions: Vec<String>,
}

impl Scope {
    /// Returns true if the scope declares nothing.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.functions.is_empty()
    }

    /// Iterates over every declared name without duplicates.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::new();
        self.variables
            .iter()
            .chain(self.functions.iter())
            .filter_map(move |name| {
                if seen.contains(&name.as_str()) {
                    None
                } else {
                    seen.push(name.as_str());
                    Some(name.as_str())
                }
            })
    }

    pub(crate) fn declare_variable(&mut self, name: &str) {
        if !self.variables.iter().any(|n| n == name) {
            self.variables.push(name.to_string());
        }
    }

    pub(crate) fn declare_function(&mut self, name: &str) {
        if !self.functions.iter().any(|n| n == name) {
            self.functions.push(name.to_string());
        }
    }
}

/// A complete program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
    /// Top-level declarations
    pub scope: Scope,
    /// Free names, in first-reference order
    pub globals: Vec<String>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Function),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(DoWhileStatement),
    /// For statement
    For(ForStatement),
    /// For-in statement
    ForIn(ForInStatement),
    /// For-of statement (rejected by the compiler)
    ForOf(ForInStatement),
    /// Return statement
    Return(Option<Expression>),
    /// Break statement with optional label
    Break(Option<String>),
    /// Continue statement with optional label
    Continue(Option<String>),
    /// Throw statement
    Throw(Expression),
    /// Try statement
    Try(TryStatement),
    /// With statement (rejected by the compiler)
    With(WithStatement),
    /// Labeled statement
    Labeled(LabeledStatement),
    /// Debugger statement
    Debugger,
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// Whether a function binds its own receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `function` declaration or expression
    Normal,
    /// Arrow function, inherits `this` and `arguments`
    Arrow,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The parameter name
    pub name: Identifier,
    /// Default value, used when the argument is undefined
    pub default: Option<Expression>,
}

/// A function body.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Statement body
    Block(Vec<Statement>),
    /// Concise arrow body
    Expression(Box<Expression>),
}

/// A function declaration, function expression or arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Normal or arrow
    pub kind: FunctionKind,
    /// Optional name
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Param>,
    /// Trailing rest parameter
    pub rest: Option<Identifier>,
    /// The function body
    pub body: FunctionBody,
    /// Declarations in the body, formals excluded
    pub scope: Scope,
}

/// A block statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
    /// Block-scoped declarations
    pub scope: Scope,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The initializer
    pub init: Option<ForInit>,
    /// The condition
    pub test: Option<Expression>,
    /// The update expression
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
    /// Names declared by a `let`/`const` initializer
    pub scope: Scope,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Expression
    Expression(Expression),
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// The discriminant expression
    pub discriminant: Expression,
    /// The case clauses
    pub cases: Vec<SwitchCase>,
    /// Names declared in any case body
    pub scope: Scope,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expression>,
    /// The consequent statements
    pub consequent: Vec<Statement>,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    /// The loop body
    pub body: Box<Statement>,
    /// The condition
    pub test: Expression,
}

/// A for-in statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The object to iterate over
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Names declared by a `let`/`const` left-hand side
    pub scope: Scope,
}

/// Left-hand side of for-in.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInLeft {
    /// Variable declaration
    Declaration(VariableKind, Identifier),
    /// Expression (identifier or member)
    Expression(Expression),
}

/// A try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    /// The try block
    pub block: BlockStatement,
    /// The catch clause
    pub handler: Option<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// The error parameter
    pub param: Option<Identifier>,
    /// The catch body
    pub body: Vec<Statement>,
    /// Names declared in the catch body, the parameter excluded
    pub scope: Scope,
}

/// A with statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WithStatement {
    /// The object expression
    pub object: Expression,
    /// The body statement
    pub body: Box<Statement>,
}

/// A labeled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    /// The label
    pub label: String,
    /// The labeled body
    pub body: Box<Statement>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// this keyword
    This,
    /// Array literal
    Array(Vec<Option<Expression>>),
    /// Object literal
    Object(Vec<Property>),
    /// Function or arrow function expression
    Function(Box<Function>),
    /// Unary expression
    Unary(UnaryExpression),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Binary expression
    Binary(BinaryExpression),
    /// Logical expression (&&, ||, ??)
    Logical(LogicalExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function call expression
    Call(CallExpression),
    /// new expression
    New(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// Sequence expression (comma operator)
    Sequence(Vec<Expression>),
    /// Spread element, valid only in call arguments and array literals
    Spread(Box<Expression>),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// undefined literal
    Undefined,
    /// Regular expression literal
    RegExp {
        /// The pattern source
        pattern: String,
        /// The flags
        flags: String,
    },
}

/// An object property.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// `key: value`
    Init {
        /// The property key
        key: PropertyKey,
        /// The property value
        value: Expression,
    },
    /// `get key() {}` / `set key(v) {}` (rejected by the compiler)
    Accessor {
        /// The property key
        key: PropertyKey,
        /// The accessor function
        function: Function,
    },
    /// `...expr` (rejected by the compiler)
    Spread(Expression),
}

/// A property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier or string key
    Named(String),
    /// Numeric key
    Number(f64),
    /// Computed key
    Computed(Box<Expression>),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
    /// **
    Exponent,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// <
    LessThan,
    /// <=
    LessThanEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterThanEqual,
    /// &
    BitwiseAnd,
    /// |
    BitwiseOr,
    /// ^
    BitwiseXor,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// in
    In,
    /// instanceof
    InstanceOf,
}

/// A logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    Nullish,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The left-hand side
    pub left: Box<Expression>,
    /// The right-hand side
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// Compound assignment through a binary operator (`+=`, `<<=`, ...)
    Compound(BinaryOperator),
    /// Logical assignment (`&&=`, `||=`, `??=`)
    Logical(LogicalOperator),
}

/// A call or `new` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
}

/// Member property.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// Dot notation
    Identifier(String),
    /// Bracket notation
    Expression(Box<Expression>),
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// The consequent (if true)
    pub consequent: Box<Expression>,
    /// The alternate (if false)
    pub alternate: Box<Expression>,
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}
