use serde::{Deserialize, Serialize};

pub mod fmt;
pub mod value;
pub mod visit;

pub use value::{Value, ValueType};

/// Unary operators, in the order the parser produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    LogicalNot, // not
    BitwiseNot, // ~
    Positive,   // +
    Negative,   // -
    Yield,      // yield (expression form)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    LogicalOr,       // or
    LogicalAnd,      // and
    LessThan,        // <
    GreaterThan,     // >
    Equality,        // ==
    GreaterOrEqual,  // >=
    LessOrEqual,     // <=
    NotEqual,        // != and <>
    In,              // in
    NotIn,           // not in
    Is,              // is
    IsNot,           // is not
    Or,              // |
    And,             // &
    Xor,             // ^
    LeftShift,       // <<
    RightShift,      // >>
    Addition,        // +
    Subtraction,     // -
    Multiplication,  // *
    Division,        // /
    Modulus,         // %
    IntegerDivision, // //
    Exponentiation,  // **
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TernaryOperator {
    IfElse, // x if y else z
}

/// The twelve augmented-assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AugmentOperator {
    Addition,        // +=
    Subtraction,     // -=
    Multiplication,  // *=
    Division,        // /=
    Modulus,         // %=
    And,             // &=
    Or,              // |=
    Xor,             // ^=
    LeftShift,       // <<=
    RightShift,      // >>=
    Exponentiation,  // **=
    IntegerDivision, // //=
}

impl AugmentOperator {
    pub fn binary_operator(self) -> BinaryOperator {
        match self {
            AugmentOperator::Addition => BinaryOperator::Addition,
            AugmentOperator::Subtraction => BinaryOperator::Subtraction,
            AugmentOperator::Multiplication => BinaryOperator::Multiplication,
            AugmentOperator::Division => BinaryOperator::Division,
            AugmentOperator::Modulus => BinaryOperator::Modulus,
            AugmentOperator::And => BinaryOperator::And,
            AugmentOperator::Or => BinaryOperator::Or,
            AugmentOperator::Xor => BinaryOperator::Xor,
            AugmentOperator::LeftShift => BinaryOperator::LeftShift,
            AugmentOperator::RightShift => BinaryOperator::RightShift,
            AugmentOperator::Exponentiation => BinaryOperator::Exponentiation,
            AugmentOperator::IntegerDivision => BinaryOperator::IntegerDivision,
        }
    }
}

/// One declared argument in a function/lambda definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    pub name: String,
    pub default_value: Option<Expr>,
    pub offset: usize,
}

/// A function or lambda argument list. Positional arguments appear before
/// keyword (defaulted) arguments; `*args` and `**kwargs` are split out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionArguments {
    pub args: Vec<ArgumentDefinition>,
    pub varargs_name: Option<String>,
    pub varkwargs_name: Option<String>,
}

// ==================== Expressions ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Unary(UnaryOperation),
    Binary(BinaryOperation),
    Ternary(TernaryOperation),
    ListCtor(ListConstructor),
    DictCtor(DictConstructor),
    SetCtor(SetConstructor),
    TupleCtor(TupleConstructor),
    ListComp(ListComprehension),
    DictComp(DictComprehension),
    SetComp(SetComprehension),
    Lambda(LambdaDefinition),
    Call(FunctionCall),
    Index(ArrayIndex),
    Slice(ArraySlice),
    Int(IntegerConstant),
    Float(FloatConstant),
    Bytes(BytesConstant),
    Unicode(UnicodeConstant),
    True(TrueConstant),
    False(FalseConstant),
    None(NoneConstant),
    Variable(VariableLookup),
    Attribute(AttributeLookup),
}

impl Expr {
    pub fn offset(&self) -> usize {
        match self {
            Expr::Unary(x) => x.offset,
            Expr::Binary(x) => x.offset,
            Expr::Ternary(x) => x.offset,
            Expr::ListCtor(x) => x.offset,
            Expr::DictCtor(x) => x.offset,
            Expr::SetCtor(x) => x.offset,
            Expr::TupleCtor(x) => x.offset,
            Expr::ListComp(x) => x.offset,
            Expr::DictComp(x) => x.offset,
            Expr::SetComp(x) => x.offset,
            Expr::Lambda(x) => x.offset,
            Expr::Call(x) => x.offset,
            Expr::Index(x) => x.offset,
            Expr::Slice(x) => x.offset,
            Expr::Int(x) => x.offset,
            Expr::Float(x) => x.offset,
            Expr::Bytes(x) => x.offset,
            Expr::Unicode(x) => x.offset,
            Expr::True(x) => x.offset,
            Expr::False(x) => x.offset,
            Expr::None(x) => x.offset,
            Expr::Variable(x) => x.offset,
            Expr::Attribute(x) => x.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOperation {
    pub oper: UnaryOperator,
    pub expr: Box<Expr>,
    /// Only used when `oper` is Yield.
    pub split_id: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperation {
    pub oper: BinaryOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TernaryOperation {
    pub oper: TernaryOperator,
    pub left: Box<Expr>,
    pub center: Box<Expr>,
    pub right: Box<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConstructor {
    pub items: Vec<Expr>,
    #[serde(skip)]
    pub value_type: Option<Value>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictConstructor {
    pub items: Vec<(Expr, Expr)>,
    #[serde(skip)]
    pub key_type: Option<Value>,
    #[serde(skip)]
    pub value_type: Option<Value>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetConstructor {
    pub items: Vec<Expr>,
    #[serde(skip)]
    pub value_type: Option<Value>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleConstructor {
    pub items: Vec<Expr>,
    #[serde(skip)]
    pub value_types: Vec<Value>,
    pub offset: usize,
}

/// `[item_pattern for variable in source_data if predicate]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListComprehension {
    pub item_pattern: Box<Expr>,
    pub variable: LValue,
    pub source_data: Box<Expr>,
    pub predicate: Option<Box<Expr>>,
    pub offset: usize,
}

/// `{key_pattern: value_pattern for variable in source_data if predicate}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictComprehension {
    pub key_pattern: Box<Expr>,
    pub value_pattern: Box<Expr>,
    pub variable: LValue,
    pub source_data: Box<Expr>,
    pub predicate: Option<Box<Expr>>,
    pub offset: usize,
}

/// `{item_pattern for variable in source_data if predicate}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetComprehension {
    pub item_pattern: Box<Expr>,
    pub variable: LValue,
    pub source_data: Box<Expr>,
    pub predicate: Option<Box<Expr>>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaDefinition {
    pub args: FunctionArguments,
    pub result: Box<Expr>,
    /// Assigned by the annotation pass.
    pub function_id: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub function: Box<Expr>,
    pub args: Vec<Expr>,
    pub kwargs: Vec<(String, Expr)>,
    pub varargs: Option<Box<Expr>>,
    pub varkwargs: Option<Box<Expr>>,
    /// Assigned by the annotation pass; cleared by analysis when the call's
    /// return type is statically known.
    pub split_id: i64,
    /// Assigned by the analysis pass when the callee is statically known.
    pub callee_function_id: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayIndex {
    pub array: Box<Expr>,
    pub index: Box<Expr>,
    /// Set by the analysis pass when the subscript is a compile-time
    /// constant.
    pub index_constant: bool,
    pub index_value: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySlice {
    pub array: Box<Expr>,
    pub start_index: Option<Box<Expr>>,
    pub end_index: Option<Box<Expr>>,
    pub step_size: Option<Box<Expr>>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegerConstant {
    pub value: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatConstant {
    pub value: f64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytesConstant {
    pub value: Vec<u8>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnicodeConstant {
    pub value: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueConstant {
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalseConstant {
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoneConstant {
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableLookup {
    pub name: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeLookup {
    pub base: Box<Expr>,
    pub name: String,
    /// Assigned by the analysis pass when the base is a module.
    pub base_module_name: Option<String>,
    pub offset: usize,
}

// ==================== L-values ====================

/// Assignment targets. A bare name, an attribute write, a subscript or
/// slice write, or a tuple of targets; nothing else may appear on the left
/// of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LValue {
    Name(NameTarget),
    Attribute(AttributeTarget),
    Index(IndexTarget),
    Slice(SliceTarget),
    Tuple(TupleTarget),
}

impl LValue {
    pub fn offset(&self) -> usize {
        match self {
            LValue::Name(x) => x.offset,
            LValue::Attribute(x) => x.offset,
            LValue::Index(x) => x.offset,
            LValue::Slice(x) => x.offset,
            LValue::Tuple(x) => x.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameTarget {
    pub name: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTarget {
    pub base: Box<Expr>,
    pub name: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexTarget {
    pub array: Box<Expr>,
    pub index: Box<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceTarget {
    pub array: Box<Expr>,
    pub start_index: Option<Box<Expr>>,
    pub end_index: Option<Box<Expr>>,
    pub step_size: Option<Box<Expr>>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleTarget {
    pub items: Vec<LValue>,
    pub offset: usize,
}

// ==================== Statements ====================

/// The root of a parsed module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub items: Vec<Stmt>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expression(ExpressionStatement),
    Assignment(AssignmentStatement),
    Augment(AugmentStatement),
    Delete(DeleteStatement),
    Pass(PassStatement),
    Import(ImportStatement),
    Global(GlobalStatement),
    Exec(ExecStatement),
    Assert(AssertStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Return(ReturnStatement),
    Raise(RaiseStatement),
    Yield(YieldStatement),
    If(IfStatement),
    For(ForStatement),
    While(WhileStatement),
    Try(TryStatement),
    With(WithStatement),
    FunctionDef(FunctionDefinition),
    ClassDef(ClassDefinition),
}

impl Stmt {
    pub fn offset(&self) -> usize {
        match self {
            Stmt::Expression(x) => x.offset,
            Stmt::Assignment(x) => x.offset,
            Stmt::Augment(x) => x.offset,
            Stmt::Delete(x) => x.offset,
            Stmt::Pass(x) => x.offset,
            Stmt::Import(x) => x.offset,
            Stmt::Global(x) => x.offset,
            Stmt::Exec(x) => x.offset,
            Stmt::Assert(x) => x.offset,
            Stmt::Break(x) => x.offset,
            Stmt::Continue(x) => x.offset,
            Stmt::Return(x) => x.offset,
            Stmt::Raise(x) => x.offset,
            Stmt::Yield(x) => x.offset,
            Stmt::If(x) => x.offset,
            Stmt::For(x) => x.offset,
            Stmt::While(x) => x.offset,
            Stmt::Try(x) => x.offset,
            Stmt::With(x) => x.offset,
            Stmt::FunctionDef(x) => x.offset,
            Stmt::ClassDef(x) => x.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    pub expr: Expr,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStatement {
    pub target: LValue,
    pub value: Expr,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentStatement {
    pub oper: AugmentOperator,
    pub target: LValue,
    pub value: Expr,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub targets: LValue,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassStatement {
    pub offset: usize,
}

/// The three import shapes:
/// 1. `import a [as b], c [as d], ...` — `modules` has one or more entries,
///    `names` is empty.
/// 2. `from m import a [as b], ...` — `modules` has one entry, `names` one
///    or more.
/// 3. `from m import *` — `modules` has one entry, `names` is empty, and
///    `import_star` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStatement {
    pub modules: Vec<(String, String)>,
    pub names: Vec<(String, String)>,
    pub import_star: bool,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStatement {
    pub names: Vec<String>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecStatement {
    pub code: Expr,
    pub globals: Option<Expr>,
    pub locals: Option<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertStatement {
    pub check: Expr,
    pub failure_message: Option<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakStatement {
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueStatement {
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub value: Option<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaiseStatement {
    pub type_expr: Option<Expr>,
    pub value: Option<Expr>,
    pub traceback: Option<Expr>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldStatement {
    /// None yields None.
    pub expr: Option<Expr>,
    pub from: bool,
    /// Assigned by the annotation pass.
    pub split_id: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub check: Expr,
    pub items: Vec<Stmt>,
    pub elifs: Vec<ElifStatement>,
    pub else_suite: Option<ElseStatement>,
    /// Set by the analysis pass when the predicate is statically known.
    pub always_true: bool,
    pub always_false: bool,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElifStatement {
    pub check: Expr,
    pub items: Vec<Stmt>,
    pub always_true: bool,
    pub always_false: bool,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseStatement {
    pub items: Vec<Stmt>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    pub variable: LValue,
    pub collection: Expr,
    pub items: Vec<Stmt>,
    pub else_suite: Option<ElseStatement>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub condition: Expr,
    pub items: Vec<Stmt>,
    pub else_suite: Option<ElseStatement>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptStatement {
    /// None for a bare `except:` clause.
    pub types: Option<Expr>,
    pub name: Option<String>,
    pub items: Vec<Stmt>,
    /// Resolved by the analysis pass.
    pub class_ids: Vec<i64>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinallyStatement {
    pub items: Vec<Stmt>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    pub items: Vec<Stmt>,
    pub excepts: Vec<ExceptStatement>,
    pub else_suite: Option<ElseStatement>,
    pub finally_suite: Option<FinallyStatement>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithStatement {
    pub item_to_name: Vec<(Expr, Option<String>)>,
    pub items: Vec<Stmt>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub decorators: Vec<Expr>,
    pub name: String,
    pub args: FunctionArguments,
    pub items: Vec<Stmt>,
    /// Assigned by the annotation pass.
    pub function_id: i64,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub decorators: Vec<Expr>,
    pub name: String,
    pub parent_types: Vec<Expr>,
    pub items: Vec<Stmt>,
    /// Assigned by the annotation pass.
    pub class_id: i64,
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ast_serialization_round_trip() {
        // serialized trees must survive a round trip
        let expr = Expr::Binary(BinaryOperation {
            oper: BinaryOperator::Addition,
            left: Box::new(Expr::Int(IntegerConstant { value: 1, offset: 0 })),
            right: Box::new(Expr::Unicode(UnicodeConstant {
                value: "two".to_string(),
                offset: 4,
            })),
            offset: 0,
        });
        let encoded = serde_json::to_string(&expr).expect("serialization failed");
        let decoded: Expr = serde_json::from_str(&encoded).expect("deserialization failed");
        assert_eq!(expr, decoded);
    }

    #[test]
    fn test_augment_operator_mapping() {
        assert_eq!(
            AugmentOperator::Addition.binary_operator(),
            BinaryOperator::Addition
        );
        assert_eq!(
            AugmentOperator::IntegerDivision.binary_operator(),
            BinaryOperator::IntegerDivision
        );
        assert_eq!(
            AugmentOperator::Exponentiation.binary_operator(),
            BinaryOperator::Exponentiation
        );
    }
}
