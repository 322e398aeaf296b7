//! Built-in Chinese prompt templates
//!
//! Placeholders use `{name}` and are filled by [`super::render`].

// Hyde: classification

pub const QUESTION_CLASSIFICATION: &str = r#"
你是一个专业的问题分类专家。请分析以下问题，并将其归类到最合适的类别中。

**分类标准**：

**技术类 (technical)**：
- 编程、算法、代码实现相关
- 系统架构、技术框架、工具使用
- 软件开发、数据库、API设计
- 性能优化、调试、技术原理

**商业类 (business)**：
- 市场营销、销售策略、商业模式
- 管理运营、客户服务、产品规划
- 财务分析、竞争策略、品牌建设

**学术类 (academic)**：
- 科学研究、理论分析、实验设计
- 学术论文、文献综述、研究方法
- 数据统计、模型建立、假设验证

**通用增强类 (enhanced)**：
- 综合性问题，涉及多个领域
- 复杂的概念解释和知识问答
- 不明确属于以上三类的问题

**问题**：{question}

**分析要求**：
1. 仔细分析问题的核心内容和关键词
2. 选择最符合的单一类别
3. 结果只需要返回分类结果(technical/business/academic/enhanced)，不需要任何解释
"#;

// Hyde: hypothetical answers

pub const HYDE_GENERAL: &str = r#"
你是一个知识渊博的专家，擅长根据问题生成详细、全面的答案。

请基于以下问题，生成一个假设性的、理想的、详细的答案。这个答案应该：
1. 包含丰富的上下文信息和背景知识
2. 提供具体的细节、数据、例子和解释
3. 覆盖问题的多个相关方面
4. 使用专业术语和相关概念
5. 结构清晰，逻辑连贯

**重要说明**：这个答案是为了向量检索优化而生成的，不需要保证完全准确。重点是生成语义丰富、上下文充实的内容。

**用户问题**：{question}

**请生成一个详细的假设性答案**：
"#;

pub const HYDE_TECHNICAL: &str = r#"
作为一名资深技术专家，请针对以下技术问题生成一个详细的假设性答案。

你的答案应该包含：
- 技术背景和原理解释
- 具体的实现方法和代码示例
- 相关的技术栈、工具和框架
- 最佳实践和常见陷阱
- 性能考量和优化策略

**技术问题**：{question}

**详细技术解答**：
"#;

pub const HYDE_BUSINESS: &str = r#"
作为一名经验丰富的商业顾问，请针对以下业务问题提供一个全面的假设性分析。

你的分析应该涵盖：
- 问题的商业背景和市场环境
- 相关的商业模式和策略框架
- 具体的解决方案和实施步骤
- 风险评估和机会分析
- 行业最佳实践和案例研究

**业务问题**：{question}

**商业分析**：
"#;

pub const HYDE_ACADEMIC: &str = r#"
作为一名学术研究专家，请针对以下学术问题提供一个深入的假设性论述。

你的论述应该包含：
- 理论基础和文献背景
- 研究方法和实验设计
- 数据分析和结果解释
- 学术争议和不同观点
- 未来研究方向和影响

**学术问题**：{question}

**学术论述**：
"#;

pub const HYDE_ENHANCED: &str = r#"
请扮演该领域的权威专家，针对以下问题生成一个详尽的假设性答案。

**答案要求**：
✓ 从多个角度全面分析问题
✓ 提供具体的事实、数据和案例
✓ 包含相关的专业术语和概念
✓ 解释因果关系和内在逻辑
✓ 讨论潜在的挑战和解决方案
✓ 语言丰富，信息密度高

**问题**：{question}

**开始详细解答**：
"#;

// Hyde: final answers over retrieved documents

pub const FINAL_ANSWER_GENERAL: &str = r#"
你是一个专业的知识问答专家。现在需要你基于检索到的相关文档，为用户的问题提供准确、详细的最终答案。

**用户问题**：{question}

**检索到的相关文档**：
{context}

**回答要求**：
1. **准确性优先**：严格基于提供的文档内容进行回答，不要添加文档中没有的信息
2. **引用支撑**：在回答中明确引用具体的文档内容作为支撑
3. **结构清晰**：组织答案结构，使用标题、要点等方式提高可读性
4. **诚实表达**：如果文档信息不足或存在矛盾，请明确说明

**开始回答**：
"#;

pub const FINAL_ANSWER_TECHNICAL: &str = r#"
你是一个资深技术专家。基于检索到的技术文档，为用户提供专业、实用的技术解答。

**技术问题**：{question}

**技术文档资料**：
{context}

**技术回答要求**：
1. **技术准确性**：确保所有技术细节、代码示例、配置参数等完全准确
2. **实用性**：提供可直接应用的解决方案和最佳实践
3. **技术原理**：解释技术实现的底层原理和机制
4. **注意事项**：指出可能的坑点、限制条件和注意事项

**请提供技术解答**：
"#;

pub const FINAL_ANSWER_BUSINESS: &str = r#"
你是一个经验丰富的商业顾问。基于检索到的商业资料，为用户提供实用的商业建议和分析。

**商业问题**：{question}

**商业资料**：
{context}

**商业回答要求**：
1. **实用性**：提供可操作的商业建议和具体行动方案
2. **数据支撑**：如果文档中有数据、案例，请在回答中引用
3. **风险评估**：分析可能的风险和挑战
4. **可行性**：评估建议的可行性和实施难度

**请提供商业分析**：
"#;

pub const FINAL_ANSWER_ACADEMIC: &str = r#"
你是一个严谨的学术研究专家。基于检索到的学术文献和资料，为用户提供科学、严谨的学术回答。

**学术问题**：{question}

**学术资料**：
{context}

**学术回答要求**：
1. **科学严谨**：确保所有结论都有充分的文献支撑
2. **文献引用**：明确引用相关研究、理论和数据来源
3. **客观中立**：保持学术客观性，避免主观臆断
4. **学术争议**：如果存在不同观点，请客观呈现

**请提供学术分析**：
"#;

// Refine

pub const REFINE_INITIAL: &str = r#"
请根据以下上下文信息回答问题。

**上下文信息**：
{context}

**问题**：{question}

请给出基于上述上下文的回答：
"#;

pub const REFINE_ITERATION: &str = r#"
我们已经有了一个针对问题的初步回答，现在有机会结合更多上下文信息来完善它。

**问题**：{question}

**已有回答**：
{existing_answer}

**新的上下文信息**：
{context}

请结合新的上下文信息完善已有回答。如果新的上下文没有帮助，请原样保留已有回答。

**完善后的回答**：
"#;

// Map-Reduce

pub const MAP: &str = r#"
以下是第{chunk_index}个文档片段：

{context}

请仅根据这个片段回答问题：{question}

如果该片段中没有与问题相关的信息，请直接说明"该片段不包含相关信息"。
"#;

pub const REDUCE: &str = r#"
你需要把多个文档片段各自的回答整合成一个完整的最终答案。

**问题**：{question}

**各片段的回答**：
{map_results}

**整合要求**：
1. 合并各片段中的有效信息，去除重复内容
2. 忽略声明不包含相关信息的片段
3. 如果片段之间存在矛盾，请明确指出
4. 结构清晰，直接回应问题

**最终答案**：
"#;

// Query decomposition

pub const QUERY_DECOMPOSITION: &str = r#"
你是一个专业的问题分析专家。你的任务是将用户的复杂问题分解成多个简单、具体的子问题，以便更好地进行信息检索和回答。

## 分解原则：
1. 将复杂问题拆分成2-5个相互独立但相关的子问题
2. 每个子问题应该足够具体，可以通过单次检索获得明确答案
3. 子问题应该覆盖原问题的所有关键方面
4. 保持子问题的逻辑顺序和连贯性
5. 避免重复或过于相似的子问题

## 输出格式：
请按照以下JSON格式输出分解后的子问题：
```json
{
    "original_query": "原始问题",
    "sub_queries": [
        {
            "id": 1,
            "question": "子问题1",
            "focus": "关注点描述"
        },
        {
            "id": 2,
            "question": "子问题2",
            "focus": "关注点描述"
        }
    ],
    "reasoning": "分解思路说明"
}
```

## 用户问题：
{query}

请对上述问题进行分解：
"#;

pub const SINGLE_QUERY: &str = r#"
请根据以下上下文信息回答问题。

**上下文信息**：
{context}

**问题**：{query}

请给出简洁、准确的回答。如果上下文中没有相关信息，请明确说明。
"#;

pub const RESULT_SUMMARIZATION: &str = r#"
你是一个专业的信息整合专家。你需要根据多个子问题的回答，为用户的原始问题提供一个全面、准确、连贯的最终答案。

## 汇总原则：
1. 综合所有子问题的答案，确保信息完整性
2. 消除重复信息，保持答案简洁明了
3. 保持逻辑清晰，按重要性和逻辑顺序组织内容
4. 如果子答案之间存在矛盾，需要明确指出并分析原因
5. 确保最终答案直接回应原始问题

## 原始问题：
{original_query}

## 子问题及其答案：
{sub_qa_pairs}

## 请提供最终的综合答案：
"#;
