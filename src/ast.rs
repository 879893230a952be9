//! Abstract syntax tree for the supported JavaScript subset.
//!
//! Every node carries a [`NodeId`] assigned by the parser. Node ids are the
//! identity used by the resolution map, by breakpoints, and by the stepping
//! protocol; cloning a subtree (e.g. into a closure) preserves them.

use crate::lexer::Span;
use crate::value::JsString;

/// Unique identity of one AST node within a parsed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of node tags, as displayed by the stepping/debugging
/// surface. Names follow the conventional debugger vocabulary
/// (`LiteralNumericExpression`, `VariableDeclarationStatement`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Script,
    VariableDeclarationStatement,
    VariableDeclarator,
    FunctionDeclaration,
    ClassDeclaration,
    BlockStatement,
    IfStatement,
    ForStatement,
    ForInStatement,
    ForOfStatement,
    WhileStatement,
    DoWhileStatement,
    TryStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    ExpressionStatement,
    SwitchStatement,
    LabeledStatement,
    EmptyStatement,
    DebuggerStatement,
    IdentifierExpression,
    ThisExpression,
    LiteralNumericExpression,
    LiteralStringExpression,
    LiteralBooleanExpression,
    LiteralNullExpression,
    LiteralInfinityExpression,
    ArrayExpression,
    ObjectExpression,
    FunctionExpression,
    ArrowExpression,
    BinaryExpression,
    LogicalExpression,
    UnaryExpression,
    UpdateExpression,
    AssignmentExpression,
    CompoundAssignmentExpression,
    ConditionalExpression,
    CallExpression,
    NewExpression,
    StaticMemberExpression,
    ComputedMemberExpression,
    SequenceExpression,
    SpreadElement,
    Super,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A complete parsed program.
#[derive(Debug, Clone)]
pub struct Program {
    pub id: NodeId,
    pub body: Vec<Statement>,
    pub span: Span,
}

// ============ STATEMENTS ============

#[derive(Debug, Clone)]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(FunctionDeclaration),
    ClassDeclaration(ClassDeclaration),
    Block(BlockStatement),
    If(IfStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    ForOf(ForOfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    Try(TryStatement),
    Return(ReturnStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Throw(ThrowStatement),
    Expression(ExpressionStatement),

    // Parsed so that `skip_unsupported_nodes` can turn them into no-ops, but
    // the evaluator has no handler for them.
    Switch(SwitchStatement),
    Labeled(LabeledStatement),

    Empty(EmptyStatement),
    Debugger(DebuggerStatement),
}

impl Statement {
    pub fn node_id(&self) -> NodeId {
        match self {
            Statement::VariableDeclaration(s) => s.id,
            Statement::FunctionDeclaration(s) => s.id,
            Statement::ClassDeclaration(s) => s.id,
            Statement::Block(s) => s.id,
            Statement::If(s) => s.id,
            Statement::For(s) => s.id,
            Statement::ForIn(s) => s.id,
            Statement::ForOf(s) => s.id,
            Statement::While(s) => s.id,
            Statement::DoWhile(s) => s.id,
            Statement::Try(s) => s.id,
            Statement::Return(s) => s.id,
            Statement::Break(s) => s.id,
            Statement::Continue(s) => s.id,
            Statement::Throw(s) => s.id,
            Statement::Expression(s) => s.id,
            Statement::Switch(s) => s.id,
            Statement::Labeled(s) => s.id,
            Statement::Empty(s) => s.id,
            Statement::Debugger(s) => s.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::VariableDeclaration(_) => NodeKind::VariableDeclarationStatement,
            Statement::FunctionDeclaration(_) => NodeKind::FunctionDeclaration,
            Statement::ClassDeclaration(_) => NodeKind::ClassDeclaration,
            Statement::Block(_) => NodeKind::BlockStatement,
            Statement::If(_) => NodeKind::IfStatement,
            Statement::For(_) => NodeKind::ForStatement,
            Statement::ForIn(_) => NodeKind::ForInStatement,
            Statement::ForOf(_) => NodeKind::ForOfStatement,
            Statement::While(_) => NodeKind::WhileStatement,
            Statement::DoWhile(_) => NodeKind::DoWhileStatement,
            Statement::Try(_) => NodeKind::TryStatement,
            Statement::Return(_) => NodeKind::ReturnStatement,
            Statement::Break(_) => NodeKind::BreakStatement,
            Statement::Continue(_) => NodeKind::ContinueStatement,
            Statement::Throw(_) => NodeKind::ThrowStatement,
            Statement::Expression(_) => NodeKind::ExpressionStatement,
            Statement::Switch(_) => NodeKind::SwitchStatement,
            Statement::Labeled(_) => NodeKind::LabeledStatement,
            Statement::Empty(_) => NodeKind::EmptyStatement,
            Statement::Debugger(_) => NodeKind::DebuggerStatement,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub id: NodeId,
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub id: NodeId,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub id: NodeId,
    pub pattern: Pattern,
    pub init: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub id: NodeId,
    pub name: Identifier,
    pub params: Vec<Pattern>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub id: NodeId,
    pub name: Identifier,
    pub super_class: Option<Box<Expression>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub is_static: bool,
    pub name: JsString,
    pub params: Vec<Pattern>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub id: NodeId,
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub id: NodeId,
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct ForInStatement {
    pub id: NodeId,
    pub left: ForInOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForOfStatement {
    pub id: NodeId,
    pub left: ForInOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForInOfLeft {
    Variable(VariableDeclaration),
    Pattern(Pattern),
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub id: NodeId,
    pub test: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DoWhileStatement {
    pub id: NodeId,
    pub body: Box<Statement>,
    pub test: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub id: NodeId,
    pub block: BlockStatement,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<BlockStatement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub id: NodeId,
    pub argument: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BreakStatement {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ContinueStatement {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ThrowStatement {
    pub id: NodeId,
    pub argument: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub id: NodeId,
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LabeledStatement {
    pub id: NodeId,
    pub label: JsString,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EmptyStatement {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DebuggerStatement {
    pub id: NodeId,
    pub span: Span,
}

// ============ PATTERNS ============

/// A binding pattern: the left-hand shape of a declaration, parameter, or
/// catch clause.
#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(Identifier),
    Array(ArrayPattern),
    Object(ObjectPattern),
    /// `pattern = defaultExpression`
    Default(Box<DefaultPattern>),
    /// `...pattern` — parsed, but rejected as unsupported when bound.
    Rest(Box<RestElement>),
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub id: NodeId,
    pub name: JsString,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayPattern {
    pub id: NodeId,
    /// `None` is an elision hole: `[a, , b]`.
    pub elements: Vec<Option<Pattern>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectPattern {
    pub id: NodeId,
    pub properties: Vec<ObjectPatternProperty>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ObjectPatternProperty {
    /// `{ key: pattern }` or shorthand `{ key }`.
    KeyValue {
        key: PropertyName,
        value: Pattern,
        span: Span,
    },
    /// `{ ...rest }` — rejected as unsupported when bound.
    Rest(RestElement),
}

#[derive(Debug, Clone)]
pub struct DefaultPattern {
    pub target: Pattern,
    pub default: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RestElement {
    pub argument: Pattern,
    pub span: Span,
}

/// A property key position: statically known or computed at runtime.
#[derive(Debug, Clone)]
pub enum PropertyName {
    Static(JsString),
    Computed(Box<Expression>),
}

// ============ EXPRESSIONS ============

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Identifier(Identifier),
    This(ThisExpression),
    Array(ArrayExpression),
    Object(ObjectExpression),
    Function(FunctionExpression),
    Arrow(ArrowExpression),
    Binary(BinaryExpression),
    Logical(LogicalExpression),
    Unary(UnaryExpression),
    Update(UpdateExpression),
    Assignment(AssignmentExpression),
    Conditional(ConditionalExpression),
    Call(CallExpression),
    New(NewExpression),
    Member(MemberExpression),
    Sequence(SequenceExpression),
    Super(SuperExpression),
}

impl Expression {
    pub fn node_id(&self) -> NodeId {
        match self {
            Expression::Literal(e) => e.id,
            Expression::Identifier(e) => e.id,
            Expression::This(e) => e.id,
            Expression::Array(e) => e.id,
            Expression::Object(e) => e.id,
            Expression::Function(e) => e.id,
            Expression::Arrow(e) => e.id,
            Expression::Binary(e) => e.id,
            Expression::Logical(e) => e.id,
            Expression::Unary(e) => e.id,
            Expression::Update(e) => e.id,
            Expression::Assignment(e) => e.id,
            Expression::Conditional(e) => e.id,
            Expression::Call(e) => e.id,
            Expression::New(e) => e.id,
            Expression::Member(e) => e.id,
            Expression::Sequence(e) => e.id,
            Expression::Super(e) => e.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::Literal(e) => match e.value {
                LiteralValue::Number(_) => NodeKind::LiteralNumericExpression,
                LiteralValue::String(_) => NodeKind::LiteralStringExpression,
                LiteralValue::Boolean(_) => NodeKind::LiteralBooleanExpression,
                LiteralValue::Null => NodeKind::LiteralNullExpression,
                LiteralValue::Infinity => NodeKind::LiteralInfinityExpression,
            },
            Expression::Identifier(_) => NodeKind::IdentifierExpression,
            Expression::This(_) => NodeKind::ThisExpression,
            Expression::Array(_) => NodeKind::ArrayExpression,
            Expression::Object(_) => NodeKind::ObjectExpression,
            Expression::Function(_) => NodeKind::FunctionExpression,
            Expression::Arrow(_) => NodeKind::ArrowExpression,
            Expression::Binary(_) => NodeKind::BinaryExpression,
            Expression::Logical(_) => NodeKind::LogicalExpression,
            Expression::Unary(_) => NodeKind::UnaryExpression,
            Expression::Update(_) => NodeKind::UpdateExpression,
            Expression::Assignment(e) => match e.operator {
                AssignmentOp::Assign => NodeKind::AssignmentExpression,
                AssignmentOp::Compound(_) => NodeKind::CompoundAssignmentExpression,
            },
            Expression::Conditional(_) => NodeKind::ConditionalExpression,
            Expression::Call(_) => NodeKind::CallExpression,
            Expression::New(_) => NodeKind::NewExpression,
            Expression::Member(e) => match e.property {
                MemberProperty::Static(_) => NodeKind::StaticMemberExpression,
                MemberProperty::Computed(_) => NodeKind::ComputedMemberExpression,
            },
            Expression::Sequence(_) => NodeKind::SequenceExpression,
            Expression::Super(_) => NodeKind::Super,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub id: NodeId,
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(JsString),
    Boolean(bool),
    Null,
    Infinity,
}

#[derive(Debug, Clone)]
pub struct ThisExpression {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SuperExpression {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayExpression {
    pub id: NodeId,
    /// `None` is an elision hole.
    pub elements: Vec<Option<ArrayElement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrayElement {
    Expression(Expression),
    Spread(SpreadElement),
}

#[derive(Debug, Clone)]
pub struct SpreadElement {
    pub id: NodeId,
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectExpression {
    pub id: NodeId,
    pub properties: Vec<ObjectProperty>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ObjectProperty {
    /// `{ key: value }`
    Data {
        key: PropertyName,
        value: Expression,
        span: Span,
    },
    /// `{ key }`
    Shorthand(Identifier),
    /// `{ key(params) { ... } }`
    Method(ObjectMethod),
    /// `{ get key() { ... } }`
    Getter(ObjectMethod),
    /// `{ set key(v) { ... } }`
    Setter(ObjectMethod),
}

#[derive(Debug, Clone)]
pub struct ObjectMethod {
    pub key: PropertyName,
    pub params: Vec<Pattern>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionExpression {
    pub id: NodeId,
    pub name: Option<Identifier>,
    pub params: Vec<Pattern>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrowExpression {
    pub id: NodeId,
    pub params: Vec<Pattern>,
    pub body: ArrowBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(BlockStatement),
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub id: NodeId,
    pub operator: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone)]
pub struct LogicalExpression {
    pub id: NodeId,
    pub operator: LogicalOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub id: NodeId,
    pub operator: UnaryOp,
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone)]
pub struct UpdateExpression {
    pub id: NodeId,
    pub operator: UpdateOp,
    pub prefix: bool,
    pub target: AssignmentTarget,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub id: NodeId,
    pub operator: AssignmentOp,
    pub target: AssignmentTarget,
    pub value: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,
    Compound(BinaryOp),
}

/// The write side of an assignment or update expression.
#[derive(Debug, Clone)]
pub enum AssignmentTarget {
    Identifier(Identifier),
    Member(Box<MemberExpression>),
}

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub id: NodeId,
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub id: NodeId,
    pub callee: Box<Expression>,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NewExpression {
    pub id: NodeId,
    pub callee: Box<Expression>,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Argument {
    Expression(Expression),
    Spread(SpreadElement),
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub id: NodeId,
    pub object: Box<Expression>,
    pub property: MemberProperty,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum MemberProperty {
    Static(JsString),
    Computed(Box<Expression>),
}

#[derive(Debug, Clone)]
pub struct SequenceExpression {
    pub id: NodeId,
    pub expressions: Vec<Expression>,
    pub span: Span,
}
